//! Assignment lifecycle: creation, submission, grading
//!
//! Submissions are keyed by (assignment, student): the first submission
//! inserts, every later one overwrites the same row and clears any grade.
//! Both the insert and the overwrite notify the owning teacher and the
//! admins in the same transaction as the mutation.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::notify::{self, Audience, DomainEvent};
use crate::services::is_unique_violation;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

/// Input for assignment creation
#[derive(Debug, Clone)]
pub struct CreateAssignmentInput {
    pub class_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub max_score: i32,
    pub attachment_ref: Option<String>,
}

/// Create an assignment in a class the teacher owns.
///
/// Atomically inserts the assignment and notifies every enrolled student
/// and every admin.
pub async fn create_assignment(
    db: &DbPool,
    teacher: &User,
    input: CreateAssignmentInput,
) -> Result<Assignment> {
    if !teacher.is_teacher() {
        return Err(AppError::Forbidden {
            message: "Only teachers can create assignments".to_string(),
        });
    }

    if input.max_score <= 0 {
        return Err(AppError::Validation {
            message: "max_score must be positive".to_string(),
            field: Some("max_score".to_string()),
        });
    }

    let class = ClassEntity::find_by_id(input.class_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::ClassNotFound {
            id: input.class_id.to_string(),
        })?;

    if class.teacher_id != teacher.id {
        return Err(AppError::Forbidden {
            message: "You do not own this class".to_string(),
        });
    }

    let actor = teacher.clone();

    let assignment = db
        .conn()
        .transaction::<_, Assignment, AppError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();

                let assignment = assignment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    title: Set(input.title),
                    description: Set(input.description),
                    due_date: Set(input.due_date.into()),
                    max_score: Set(input.max_score),
                    teacher_id: Set(actor.id),
                    class_id: Set(class.id),
                    attachment_ref: Set(input.attachment_ref),
                    created_at: Set(now.into()),
                }
                .insert(txn)
                .await?;

                let students = enrolled_students(txn, class.id).await?;
                let admins = UserEntity::find()
                    .filter(UserColumn::Role.eq(Role::Admin))
                    .all(txn)
                    .await?;

                let drafts = notify::fan_out(
                    &DomainEvent::AssignmentCreated {
                        assignment: &assignment,
                        teacher: &actor,
                    },
                    &Audience {
                        students: &students,
                        admins: &admins,
                        teacher: None,
                    },
                );

                let rows = notify::into_active_models(drafts, now);
                metrics::record_fan_out(rows.len());
                if !rows.is_empty() {
                    NotificationEntity::insert_many(rows).exec(txn).await?;
                }

                tracing::info!(
                    assignment_id = %assignment.id,
                    class_id = %class.id,
                    teacher_id = %actor.id,
                    notified_students = students.len(),
                    "Assignment created"
                );

                Ok(assignment)
            })
        })
        .await?;

    metrics::record_assignment_created();
    Ok(assignment)
}

/// Submit or resubmit an assignment.
///
/// Requires the student to be enrolled in the assignment's class. A
/// resubmission overwrites the existing row: the text (and file reference,
/// when a new one is supplied) are replaced, `submitted_at` is reset, and
/// any prior grade is cleared. A concurrent first submission racing at the
/// unique constraint degrades to the same overwrite path.
pub async fn submit_assignment(
    db: &DbPool,
    student: &User,
    assignment_id: Uuid,
    text: String,
    file_ref: Option<String>,
) -> Result<Submission> {
    if !student.is_student() {
        return Err(AppError::Forbidden {
            message: "Only students can submit assignments".to_string(),
        });
    }

    let assignment = AssignmentEntity::find_by_id(assignment_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::AssignmentNotFound {
            id: assignment_id.to_string(),
        })?;

    let enrolled = EnrollmentEntity::find()
        .filter(EnrollmentColumn::StudentId.eq(student.id))
        .filter(EnrollmentColumn::ClassId.eq(assignment.class_id))
        .one(db.conn())
        .await?
        .is_some();

    if !enrolled {
        return Err(AppError::NotEnrolled);
    }

    let actor = student.clone();

    let (submission, resubmission) = db
        .conn()
        .transaction::<_, (Submission, bool), AppError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();

                let existing = SubmissionEntity::find()
                    .filter(SubmissionColumn::AssignmentId.eq(assignment.id))
                    .filter(SubmissionColumn::StudentId.eq(actor.id))
                    .one(txn)
                    .await?;

                let resubmission = existing.is_some();

                let submission = match existing {
                    Some(existing) => overwrite(txn, existing, &text, file_ref.clone(), now).await?,
                    None => {
                        let insert = submission::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            assignment_id: Set(assignment.id),
                            student_id: Set(actor.id),
                            text: Set(text.clone()),
                            file_ref: Set(file_ref.clone()),
                            submitted_at: Set(now.into()),
                            score: Set(None),
                            feedback: Set(None),
                            graded_at: Set(None),
                            graded_by: Set(None),
                        }
                        .insert(txn)
                        .await;

                        match insert {
                            Ok(submission) => submission,
                            // Lost the race to a concurrent first submission;
                            // treat ours as the resubmission it now is.
                            Err(err) if is_unique_violation(&err) => {
                                let existing = SubmissionEntity::find()
                                    .filter(SubmissionColumn::AssignmentId.eq(assignment.id))
                                    .filter(SubmissionColumn::StudentId.eq(actor.id))
                                    .one(txn)
                                    .await?
                                    .ok_or_else(|| AppError::SubmissionNotFound {
                                        id: assignment.id.to_string(),
                                    })?;
                                overwrite(txn, existing, &text, file_ref.clone(), now).await?
                            }
                            Err(err) => return Err(err.into()),
                        }
                    }
                };

                let teacher = UserEntity::find_by_id(assignment.teacher_id)
                    .one(txn)
                    .await?;
                let admins = UserEntity::find()
                    .filter(UserColumn::Role.eq(Role::Admin))
                    .all(txn)
                    .await?;

                let drafts = notify::fan_out(
                    &DomainEvent::AssignmentSubmitted {
                        assignment: &assignment,
                        student: &actor,
                    },
                    &Audience {
                        students: &[],
                        admins: &admins,
                        teacher: teacher.as_ref(),
                    },
                );

                let rows = notify::into_active_models(drafts, now);
                metrics::record_fan_out(rows.len());
                if !rows.is_empty() {
                    NotificationEntity::insert_many(rows).exec(txn).await?;
                }

                tracing::info!(
                    submission_id = %submission.id,
                    assignment_id = %assignment.id,
                    student_id = %actor.id,
                    resubmission,
                    "Assignment submitted"
                );

                Ok((submission, resubmission))
            })
        })
        .await?;

    metrics::record_submission(resubmission);
    Ok(submission)
}

/// Grade a submission on an assignment the teacher owns.
///
/// No notification is emitted to the student here; the fan-out table has no
/// grading event (product decision pending).
pub async fn grade_submission(
    db: &DbPool,
    teacher: &User,
    submission_id: Uuid,
    score: i32,
    feedback: Option<String>,
) -> Result<Submission> {
    if !teacher.is_teacher() {
        return Err(AppError::Forbidden {
            message: "Only teachers can grade submissions".to_string(),
        });
    }

    let submission = SubmissionEntity::find_by_id(submission_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::SubmissionNotFound {
            id: submission_id.to_string(),
        })?;

    let assignment = AssignmentEntity::find_by_id(submission.assignment_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::AssignmentNotFound {
            id: submission.assignment_id.to_string(),
        })?;

    if assignment.teacher_id != teacher.id {
        return Err(AppError::Forbidden {
            message: "You do not own this assignment".to_string(),
        });
    }

    if score < 0 || score > assignment.max_score {
        return Err(AppError::Validation {
            message: format!("score must be between 0 and {}", assignment.max_score),
            field: Some("score".to_string()),
        });
    }

    let mut active = submission.into_active_model();
    active.score = Set(Some(score));
    active.feedback = Set(feedback);
    active.graded_at = Set(Some(Utc::now().into()));
    active.graded_by = Set(Some(teacher.id));

    let graded = active.update(db.conn()).await?;

    tracing::info!(
        submission_id = %graded.id,
        assignment_id = %graded.assignment_id,
        teacher_id = %teacher.id,
        score,
        "Submission graded"
    );
    metrics::record_grade();

    Ok(graded)
}

/// Users enrolled in a class, resolved through the enrollment rows
async fn enrolled_students<C: ConnectionTrait>(conn: &C, class_id: Uuid) -> Result<Vec<User>> {
    let student_ids: Vec<Uuid> = EnrollmentEntity::find()
        .filter(EnrollmentColumn::ClassId.eq(class_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|e| e.student_id)
        .collect();

    if student_ids.is_empty() {
        return Ok(Vec::new());
    }

    UserEntity::find()
        .filter(UserColumn::Id.is_in(student_ids))
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Resubmission always un-grades: the prior score, feedback, and grading
/// trail are cleared along with the replaced content.
async fn overwrite<C: ConnectionTrait>(
    conn: &C,
    existing: Submission,
    text: &str,
    file_ref: Option<String>,
    now: DateTime<Utc>,
) -> Result<Submission> {
    let mut active = existing.into_active_model();
    active.text = Set(text.to_string());
    if file_ref.is_some() {
        active.file_ref = Set(file_ref);
    }
    active.submitted_at = Set(now.into());
    active.score = Set(None);
    active.feedback = Set(None);
    active.graded_at = Set(None);
    active.graded_by = Set(None);

    active.update(conn).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn student() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::Student,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        }
    }

    fn homework(teacher_id: Uuid) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            title: "HW1".to_string(),
            description: None,
            due_date: Utc::now().into(),
            max_score: 10,
            teacher_id,
            class_id: Uuid::new_v4(),
            attachment_ref: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_submit_requires_enrollment() {
        let alice = student();
        let hw = homework(Uuid::new_v4());

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![hw.clone()]])
                .append_query_results([Vec::<Enrollment>::new()])
                .into_connection(),
        );

        let result = submit_assignment(&db, &alice, hw.id, "draft".to_string(), None).await;
        assert!(matches!(result, Err(AppError::NotEnrolled)));
    }

    #[tokio::test]
    async fn test_grade_rejects_score_above_max() {
        let carol = User {
            id: Uuid::new_v4(),
            email: "carol@example.com".to_string(),
            name: "Carol".to_string(),
            role: Role::Teacher,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        };
        let hw = homework(carol.id);
        let submission = Submission {
            id: Uuid::new_v4(),
            assignment_id: hw.id,
            student_id: Uuid::new_v4(),
            text: "final draft".to_string(),
            file_ref: None,
            submitted_at: Utc::now().into(),
            score: None,
            feedback: None,
            graded_at: None,
            graded_by: None,
        };

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![submission]])
                .append_query_results([vec![hw]])
                .into_connection(),
        );

        let result = grade_submission(&db, &carol, Uuid::new_v4(), 11, None).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_grade_requires_ownership() {
        let carol = User {
            id: Uuid::new_v4(),
            email: "carol@example.com".to_string(),
            name: "Carol".to_string(),
            role: Role::Teacher,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        };
        // Assignment owned by a different teacher
        let hw = homework(Uuid::new_v4());
        let submission = Submission {
            id: Uuid::new_v4(),
            assignment_id: hw.id,
            student_id: Uuid::new_v4(),
            text: "draft".to_string(),
            file_ref: None,
            submitted_at: Utc::now().into(),
            score: None,
            feedback: None,
            graded_at: None,
            graded_by: None,
        };

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![submission]])
                .append_query_results([vec![hw]])
                .into_connection(),
        );

        let result = grade_submission(&db, &carol, Uuid::new_v4(), 5, None).await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }
}
