//! Administrative operations: course management and cascading deletes
//!
//! Deletes cascade fully at the application level inside one transaction,
//! mirroring the ON DELETE edges the schema declares, so no engine is left
//! with orphan enrollments or submissions.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::services::is_unique_violation;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

/// Create a course with a globally unique name
pub async fn create_course(db: &DbPool, admin: &User, name: &str) -> Result<Course> {
    require_admin(admin)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::MissingField {
            field: "name".to_string(),
        });
    }

    if CourseEntity::find()
        .filter(CourseColumn::Name.eq(name))
        .one(db.conn())
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate {
            message: "Course with this name already exists".to_string(),
        });
    }

    let insert = course::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
    }
    .insert(db.conn())
    .await;

    match insert {
        Ok(course) => {
            tracing::info!(course_id = %course.id, name = %course.name, "Course created");
            Ok(course)
        }
        Err(err) if is_unique_violation(&err) => Err(AppError::Duplicate {
            message: "Course with this name already exists".to_string(),
        }),
        Err(err) => Err(err.into()),
    }
}

/// Rename a course; the new name must not collide with another course
pub async fn rename_course(db: &DbPool, admin: &User, course_id: Uuid, name: &str) -> Result<Course> {
    require_admin(admin)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::MissingField {
            field: "name".to_string(),
        });
    }

    let course = CourseEntity::find_by_id(course_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::CourseNotFound {
            id: course_id.to_string(),
        })?;

    let collision = CourseEntity::find()
        .filter(CourseColumn::Name.eq(name))
        .filter(CourseColumn::Id.ne(course.id))
        .one(db.conn())
        .await?;

    if collision.is_some() {
        return Err(AppError::Duplicate {
            message: "Another course with this name already exists".to_string(),
        });
    }

    let mut active = course.into_active_model();
    active.name = Set(name.to_string());
    active.update(db.conn()).await.map_err(Into::into)
}

/// Delete a course and everything hanging off it
pub async fn delete_course(db: &DbPool, admin: &User, course_id: Uuid) -> Result<()> {
    require_admin(admin)?;

    let course = CourseEntity::find_by_id(course_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::CourseNotFound {
            id: course_id.to_string(),
        })?;

    db.conn()
        .transaction::<_, (), AppError>(move |txn| {
            Box::pin(async move {
                let class_ids: Vec<Uuid> = ClassEntity::find()
                    .filter(ClassColumn::CourseId.eq(course.id))
                    .all(txn)
                    .await?
                    .into_iter()
                    .map(|c| c.id)
                    .collect();

                delete_class_dependents(txn, &class_ids).await?;

                if !class_ids.is_empty() {
                    ClassEntity::delete_many()
                        .filter(ClassColumn::Id.is_in(class_ids))
                        .exec(txn)
                        .await?;
                }

                CourseEntity::delete_by_id(course.id).exec(txn).await?;

                tracing::info!(course_id = %course.id, "Course deleted");
                Ok(())
            })
        })
        .await?;

    Ok(())
}

/// Delete a non-admin user and everything hanging off them.
///
/// Deleting an admin is always rejected, regardless of caller.
pub async fn delete_user(db: &DbPool, admin: &User, user_id: Uuid) -> Result<()> {
    require_admin(admin)?;

    let target = UserEntity::find_by_id(user_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            id: user_id.to_string(),
        })?;

    if target.is_admin() {
        return Err(AppError::Forbidden {
            message: "Cannot delete another admin".to_string(),
        });
    }

    db.conn()
        .transaction::<_, (), AppError>(move |txn| {
            Box::pin(async move {
                // Messages in either direction
                MessageEntity::delete_many()
                    .filter(
                        sea_orm::Condition::any()
                            .add(MessageColumn::SenderId.eq(target.id))
                            .add(MessageColumn::ReceiverId.eq(target.id)),
                    )
                    .exec(txn)
                    .await?;

                NotificationEntity::delete_many()
                    .filter(NotificationColumn::UserId.eq(target.id))
                    .exec(txn)
                    .await?;

                match target.role {
                    Role::Teacher => {
                        let class_ids: Vec<Uuid> = ClassEntity::find()
                            .filter(ClassColumn::TeacherId.eq(target.id))
                            .all(txn)
                            .await?
                            .into_iter()
                            .map(|c| c.id)
                            .collect();

                        delete_class_dependents(txn, &class_ids).await?;

                        if !class_ids.is_empty() {
                            ClassEntity::delete_many()
                                .filter(ClassColumn::Id.is_in(class_ids))
                                .exec(txn)
                                .await?;
                        }
                    }
                    Role::Student => {
                        EnrollmentEntity::delete_many()
                            .filter(EnrollmentColumn::StudentId.eq(target.id))
                            .exec(txn)
                            .await?;
                        SubmissionEntity::delete_many()
                            .filter(SubmissionColumn::StudentId.eq(target.id))
                            .exec(txn)
                            .await?;
                    }
                    Role::Admin => unreachable!("admin deletion rejected above"),
                }

                UserEntity::delete_by_id(target.id).exec(txn).await?;

                tracing::info!(user_id = %target.id, role = ?target.role, "User deleted");
                Ok(())
            })
        })
        .await?;

    Ok(())
}

/// Remove enrollments, assignments, and submissions attached to the classes
async fn delete_class_dependents<C: ConnectionTrait>(conn: &C, class_ids: &[Uuid]) -> Result<()> {
    if class_ids.is_empty() {
        return Ok(());
    }

    let assignment_ids: Vec<Uuid> = AssignmentEntity::find()
        .filter(AssignmentColumn::ClassId.is_in(class_ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();

    if !assignment_ids.is_empty() {
        SubmissionEntity::delete_many()
            .filter(SubmissionColumn::AssignmentId.is_in(assignment_ids.clone()))
            .exec(conn)
            .await?;
        AssignmentEntity::delete_many()
            .filter(AssignmentColumn::Id.is_in(assignment_ids))
            .exec(conn)
            .await?;
    }

    EnrollmentEntity::delete_many()
        .filter(EnrollmentColumn::ClassId.is_in(class_ids.to_vec()))
        .exec(conn)
        .await?;

    Ok(())
}

fn require_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            message: "Admin access required".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn account(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{:?}@example.com", role).to_lowercase(),
            name: format!("{:?}", role),
            role,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_delete_admin_is_always_rejected() {
        let root = account(Role::Admin);
        let other_admin = account(Role::Admin);
        let target_id = other_admin.id;

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![other_admin]])
                .into_connection(),
        );

        let result = delete_user(&db, &root, target_id).await;
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_course_management_requires_admin() {
        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let carol = account(Role::Teacher);

        assert!(matches!(
            create_course(&db, &carol, "Algebra I").await,
            Err(AppError::Forbidden { .. })
        ));
        assert!(matches!(
            delete_course(&db, &carol, Uuid::new_v4()).await,
            Err(AppError::Forbidden { .. })
        ));
        assert!(matches!(
            delete_user(&db, &carol, Uuid::new_v4()).await,
            Err(AppError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_course_rejects_duplicate_name() {
        let root = account(Role::Admin);
        let existing = Course {
            id: Uuid::new_v4(),
            name: "Algebra I".to_string(),
        };

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![existing]])
                .into_connection(),
        );

        let result = create_course(&db, &root, "Algebra I").await;
        assert!(matches!(result, Err(AppError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_create_course_rejects_blank_name() {
        let root = account(Role::Admin);
        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = create_course(&db, &root, "   ").await;
        assert!(matches!(result, Err(AppError::MissingField { .. })));
    }
}
