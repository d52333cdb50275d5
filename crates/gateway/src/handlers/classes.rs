//! Class management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use learntrack_common::{
    auth::AuthContext,
    db::models::{Class, Enrollment, Role},
    db::Repository,
    errors::{AppError, Result},
    services::classes::{self, CreateClassInput, EnrollOutcome},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

/// Request to create a class
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub course_id: Uuid,
}

/// Request to enroll a student by email
#[derive(Debug, Deserialize, Validate)]
pub struct EnrollStudentRequest {
    #[validate(email)]
    pub student_email: String,
}

#[derive(Debug, Serialize)]
pub struct ClassResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    pub created_at: String,
}

impl From<Class> for ClassResponse {
    fn from(class: Class) -> Self {
        Self {
            id: class.id,
            name: class.name,
            description: class.description,
            teacher_id: class.teacher_id,
            course_id: class.course_id,
            created_at: class.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct CreateClassResponse {
    pub class: ClassResponse,
    /// Students enrolled by the auto-enrollment snapshot
    pub auto_enrolled: usize,
}

#[derive(Serialize)]
pub struct EnrollStudentResponse {
    pub already_enrolled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<EnrollmentResponse>,
}

#[derive(Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub enrolled_at: String,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            student_id: enrollment.student_id,
            class_id: enrollment.class_id,
            enrolled_at: enrollment.enrolled_at.to_rfc3339(),
        }
    }
}

/// Create a class; matching students are auto-enrolled and notified
pub async fn create_class(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<CreateClassResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let (class, auto_enrolled) = classes::create_class(
        &state.db,
        &auth.user,
        CreateClassInput {
            name: request.name,
            description: request.description,
            course_id: request.course_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateClassResponse {
            class: class.into(),
            auto_enrolled,
        }),
    ))
}

/// Enroll a student into a class by email.
///
/// A repeated enrollment is not an error: it answers 200 with
/// `already_enrolled` set and leaves exactly one row behind.
pub async fn enroll_student(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(class_id): Path<Uuid>,
    Json(request): Json<EnrollStudentRequest>,
) -> Result<(StatusCode, Json<EnrollStudentResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let outcome =
        classes::enroll_student(&state.db, &auth.user, class_id, &request.student_email).await?;

    let response = match outcome {
        EnrollOutcome::Enrolled(enrollment) => (
            StatusCode::CREATED,
            Json(EnrollStudentResponse {
                already_enrolled: false,
                enrollment: Some(enrollment.into()),
            }),
        ),
        EnrollOutcome::AlreadyEnrolled => (
            StatusCode::OK,
            Json(EnrollStudentResponse {
                already_enrolled: true,
                enrollment: None,
            }),
        ),
    };

    Ok(response)
}

/// List classes visible to the caller: own classes for teachers, enrolled
/// classes for students, all classes for admins
pub async fn list_classes(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ClassResponse>>> {
    let repo = Repository::new(state.db.clone());

    let classes = match auth.role() {
        Role::Teacher => repo.list_classes_by_teacher(auth.user_id()).await?,
        Role::Student => repo.list_enrolled_classes(auth.user_id()).await?,
        Role::Admin => repo.list_classes().await?,
    };

    Ok(Json(classes.into_iter().map(Into::into).collect()))
}
