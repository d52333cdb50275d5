//! Class creation and enrollment
//!
//! Class creation carries the auto-enrollment rule: every student registered
//! for the class's course at the instant of creation is enrolled, and the
//! fan-out notifications are persisted in the same transaction as the class
//! row. Students who register for the course later are not retroactively
//! enrolled.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::notify::{self, Audience, DomainEvent};
use crate::services::is_unique_violation;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use uuid::Uuid;

/// Input for class creation
#[derive(Debug, Clone)]
pub struct CreateClassInput {
    pub name: String,
    pub description: Option<String>,
    pub course_id: Uuid,
}

/// Outcome of a manual enrollment attempt
///
/// `AlreadyEnrolled` is a soft, idempotent outcome: the pair exists, no row
/// was added, and the caller reports a warning rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled(Enrollment),
    AlreadyEnrolled,
}

/// Create a class and auto-enroll matching students.
///
/// Returns the class and the number of students enrolled. The class insert,
/// the enrollment snapshot, and every notification land atomically; a
/// nonexistent course leaves zero rows behind.
pub async fn create_class(
    db: &DbPool,
    teacher: &User,
    input: CreateClassInput,
) -> Result<(Class, usize)> {
    if !teacher.is_teacher() {
        return Err(AppError::Forbidden {
            message: "Only teachers can create classes".to_string(),
        });
    }

    let course = CourseEntity::find_by_id(input.course_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::CourseNotFound {
            id: input.course_id.to_string(),
        })?;

    let actor = teacher.clone();

    let (class, enrolled) = db
        .conn()
        .transaction::<_, (Class, usize), AppError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();

                let class = class::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(input.name),
                    description: Set(input.description),
                    teacher_id: Set(actor.id),
                    course_id: Set(course.id),
                    created_at: Set(now.into()),
                }
                .insert(txn)
                .await?;

                // Auto-enrollment rule: snapshot of matching students at
                // creation time.
                let students = UserEntity::find()
                    .filter(UserColumn::Role.eq(Role::Student))
                    .filter(UserColumn::CourseId.eq(course.id))
                    .all(txn)
                    .await?;

                let enrollments: Vec<enrollment::ActiveModel> = students
                    .iter()
                    .map(|student| enrollment::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        student_id: Set(student.id),
                        class_id: Set(class.id),
                        enrolled_at: Set(now.into()),
                    })
                    .collect();

                if !enrollments.is_empty() {
                    EnrollmentEntity::insert_many(enrollments).exec(txn).await?;
                }

                let admins = UserEntity::find()
                    .filter(UserColumn::Role.eq(Role::Admin))
                    .all(txn)
                    .await?;

                let drafts = notify::fan_out(
                    &DomainEvent::ClassCreated {
                        class: &class,
                        teacher: &actor,
                    },
                    &Audience {
                        students: &students,
                        admins: &admins,
                        teacher: None,
                    },
                );
                let notified = drafts.len();

                let rows = notify::into_active_models(drafts, now);
                if !rows.is_empty() {
                    NotificationEntity::insert_many(rows).exec(txn).await?;
                }
                metrics::record_fan_out(notified);

                tracing::info!(
                    class_id = %class.id,
                    course_id = %course.id,
                    teacher_id = %actor.id,
                    enrolled = students.len(),
                    notified,
                    "Class created"
                );

                Ok((class, students.len()))
            })
        })
        .await?;

    metrics::record_class_created(enrolled);
    Ok((class, enrolled))
}

/// Enroll a student into a class by email.
///
/// Any teacher may enroll into any class; ownership of the class is
/// deliberately not checked here. Fails with UserNotFound when no user with
/// that email holds the student role. A duplicate pair, whether seen up
/// front or lost to a concurrent writer at the unique constraint, yields
/// `AlreadyEnrolled` with exactly one row persisted.
pub async fn enroll_student(
    db: &DbPool,
    teacher: &User,
    class_id: Uuid,
    student_email: &str,
) -> Result<EnrollOutcome> {
    if !teacher.is_teacher() {
        return Err(AppError::Forbidden {
            message: "Only teachers can enroll students".to_string(),
        });
    }

    ClassEntity::find_by_id(class_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::ClassNotFound {
            id: class_id.to_string(),
        })?;

    let student = UserEntity::find()
        .filter(UserColumn::Email.eq(student_email))
        .filter(UserColumn::Role.eq(Role::Student))
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            id: student_email.to_string(),
        })?;

    let existing = EnrollmentEntity::find()
        .filter(EnrollmentColumn::StudentId.eq(student.id))
        .filter(EnrollmentColumn::ClassId.eq(class_id))
        .one(db.conn())
        .await?;

    if existing.is_some() {
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }

    let insert = enrollment::ActiveModel {
        id: Set(Uuid::new_v4()),
        student_id: Set(student.id),
        class_id: Set(class_id),
        enrolled_at: Set(Utc::now().into()),
    }
    .insert(db.conn())
    .await;

    match insert {
        Ok(enrollment) => {
            tracing::info!(
                class_id = %class_id,
                student_id = %student.id,
                teacher_id = %teacher.id,
                "Student enrolled"
            );
            metrics::record_enrollment();
            Ok(EnrollOutcome::Enrolled(enrollment))
        }
        // Concurrent writer won the unique constraint; same idempotent outcome.
        Err(err) if is_unique_violation(&err) => Ok(EnrollOutcome::AlreadyEnrolled),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn teacher() -> User {
        User {
            id: Uuid::new_v4(),
            email: "carol@example.com".to_string(),
            name: "Carol".to_string(),
            role: Role::Teacher,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        }
    }

    fn student(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Dave".to_string(),
            role: Role::Student,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        }
    }

    fn section(teacher_id: Uuid) -> Class {
        Class {
            id: Uuid::new_v4(),
            name: "Algebra Section A".to_string(),
            description: None,
            teacher_id,
            course_id: Uuid::new_v4(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_enroll_requires_teacher_role() {
        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let not_a_teacher = student("dave@x.com");

        let result = enroll_student(&db, &not_a_teacher, Uuid::new_v4(), "dave@x.com").await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_enroll_unknown_student_is_not_found() {
        let carol = teacher();
        let class = section(carol.id);
        let class_id = class.id;

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![class]])
                .append_query_results([Vec::<User>::new()])
                .into_connection(),
        );

        let result = enroll_student(&db, &carol, class_id, "ghost@x.com").await;
        assert!(matches!(result, Err(AppError::UserNotFound { .. })));
    }

    #[tokio::test]
    async fn test_enroll_twice_is_idempotent() {
        let carol = teacher();
        let class = section(carol.id);
        let class_id = class.id;
        let dave = student("dave@x.com");
        let existing = Enrollment {
            id: Uuid::new_v4(),
            student_id: dave.id,
            class_id,
            enrolled_at: Utc::now().into(),
        };

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![class]])
                .append_query_results([vec![dave]])
                .append_query_results([vec![existing]])
                .into_connection(),
        );

        let outcome = enroll_student(&db, &carol, class_id, "dave@x.com")
            .await
            .unwrap();
        assert_eq!(outcome, EnrollOutcome::AlreadyEnrolled);
    }
}
