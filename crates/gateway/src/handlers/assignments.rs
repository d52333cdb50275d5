//! Assignment and submission handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use learntrack_common::{
    auth::AuthContext,
    db::models::{Assignment, Role, Submission},
    db::Repository,
    errors::{AppError, Result},
    services::assignments::{self, CreateAssignmentInput},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

/// Request to create an assignment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    pub class_id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub due_date: DateTime<Utc>,

    #[serde(default = "default_max_score")]
    pub max_score: i32,

    /// Reference previously obtained from the file store
    #[serde(default)]
    pub attachment_ref: Option<String>,
}

fn default_max_score() -> i32 {
    10
}

/// Request to submit an assignment
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(length(min = 1))]
    pub text: String,

    /// Reference previously obtained from the file store
    #[serde(default)]
    pub file_ref: Option<String>,
}

/// Request to grade a submission
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub score: i32,

    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: String,
    pub max_score: i32,
    pub teacher_id: Uuid,
    pub class_id: Uuid,
    pub attachment_ref: Option<String>,
    pub created_at: String,
    pub is_overdue: bool,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        let is_overdue = assignment.is_overdue();
        Self {
            id: assignment.id,
            title: assignment.title,
            description: assignment.description,
            due_date: assignment.due_date.to_rfc3339(),
            max_score: assignment.max_score,
            teacher_id: assignment.teacher_id,
            class_id: assignment.class_id,
            attachment_ref: assignment.attachment_ref,
            created_at: assignment.created_at.to_rfc3339(),
            is_overdue,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub text: String,
    pub file_ref: Option<String>,
    pub submitted_at: String,
    pub score: Option<i32>,
    pub feedback: Option<String>,
    pub graded_at: Option<String>,
    pub graded_by: Option<Uuid>,
    pub is_graded: bool,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        let is_graded = submission.is_graded();
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            text: submission.text,
            file_ref: submission.file_ref,
            submitted_at: submission.submitted_at.to_rfc3339(),
            score: submission.score,
            feedback: submission.feedback,
            graded_at: submission.graded_at.map(|t| t.to_rfc3339()),
            graded_by: submission.graded_by,
            is_graded,
        }
    }
}

/// Assignment with the caller's submission, where one exists
#[derive(Serialize)]
pub struct AssignmentListItem {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionResponse>,
}

/// Create an assignment in an owned class
pub async fn create_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<AssignmentResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let assignment = assignments::create_assignment(
        &state.db,
        &auth.user,
        CreateAssignmentInput {
            class_id: request.class_id,
            title: request.title,
            description: request.description,
            due_date: request.due_date,
            max_score: request.max_score,
            attachment_ref: request.attachment_ref,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(assignment.into())))
}

/// List assignments: teachers see their own, students see those of their
/// enrolled classes together with their submission status
pub async fn list_assignments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AssignmentListItem>>> {
    let repo = Repository::new(state.db.clone());

    match auth.role() {
        Role::Teacher => {
            let assignments = repo.list_assignments_by_teacher(auth.user_id()).await?;
            Ok(Json(
                assignments
                    .into_iter()
                    .map(|a| AssignmentListItem {
                        assignment: a.into(),
                        submission: None,
                    })
                    .collect(),
            ))
        }
        Role::Student => {
            let class_ids = repo
                .list_enrollments_by_student(auth.user_id())
                .await?
                .into_iter()
                .map(|e| e.class_id)
                .collect();
            let assignments = repo.list_assignments_for_classes(class_ids).await?;

            let mut submissions: std::collections::HashMap<Uuid, Submission> = repo
                .list_submissions_by_student(auth.user_id())
                .await?
                .into_iter()
                .map(|s| (s.assignment_id, s))
                .collect();

            Ok(Json(
                assignments
                    .into_iter()
                    .map(|a| {
                        let submission = submissions.remove(&a.id).map(Into::into);
                        AssignmentListItem {
                            assignment: a.into(),
                            submission,
                        }
                    })
                    .collect(),
            ))
        }
        Role::Admin => Err(AppError::Forbidden {
            message: "Assignments are listed per teacher or student".to_string(),
        }),
    }
}

/// Submit (or resubmit) an assignment
pub async fn submit_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(assignment_id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let submission = assignments::submit_assignment(
        &state.db,
        &auth.user,
        assignment_id,
        request.text,
        request.file_ref,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(submission.into())))
}

/// List submissions for an owned assignment
pub async fn list_submissions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<Vec<SubmissionResponse>>> {
    auth.require_teacher()?;

    let repo = Repository::new(state.db.clone());

    let assignment = repo
        .find_assignment_by_id(assignment_id)
        .await?
        .ok_or_else(|| AppError::AssignmentNotFound {
            id: assignment_id.to_string(),
        })?;

    if assignment.teacher_id != auth.user_id() {
        return Err(AppError::Forbidden {
            message: "You do not own this assignment".to_string(),
        });
    }

    let submissions = repo.list_submissions_by_assignment(assignment_id).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}

/// Grade a submission on an owned assignment
pub async fn grade_submission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(submission_id): Path<Uuid>,
    Json(request): Json<GradeRequest>,
) -> Result<Json<SubmissionResponse>> {
    let graded = assignments::grade_submission(
        &state.db,
        &auth.user,
        submission_id,
        request.score,
        request.feedback,
    )
    .await?;

    Ok(Json(graded.into()))
}

/// A student's graded submissions, most recent grade first
pub async fn performance(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<SubmissionResponse>>> {
    auth.require_student()?;

    let submissions = Repository::new(state.db.clone())
        .list_graded_submissions(auth.user_id())
        .await?;

    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}
