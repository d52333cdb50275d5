//! Registration, authentication, and admin provisioning

use crate::auth;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::services::is_unique_violation;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

/// Input for self-service registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Course binding for students; drives auto-enrollment later
    pub course_id: Option<Uuid>,
}

/// Register a new student or teacher account.
///
/// Role is assigned immutably at creation. Admin accounts are never created
/// here; see [`provision_admin`].
pub async fn register(db: &DbPool, input: RegisterInput) -> Result<User> {
    if input.role.is_admin() {
        return Err(AppError::Forbidden {
            message: "Admin accounts are provisioned, not registered".to_string(),
        });
    }

    if UserEntity::find()
        .filter(UserColumn::Email.eq(input.email.as_str()))
        .one(db.conn())
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate {
            message: "Email already registered".to_string(),
        });
    }

    // Only students bind to a course at registration time
    let course_id = match input.role {
        Role::Student => {
            if let Some(course_id) = input.course_id {
                CourseEntity::find_by_id(course_id)
                    .one(db.conn())
                    .await?
                    .ok_or_else(|| AppError::CourseNotFound {
                        id: course_id.to_string(),
                    })?;
                Some(course_id)
            } else {
                None
            }
        }
        Role::Teacher | Role::Admin => None,
    };

    let password_hash = auth::hash_password(&input.password)?;

    let insert = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(input.email.clone()),
        name: Set(input.name),
        role: Set(input.role),
        password_hash: Set(password_hash),
        course_id: Set(course_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.conn())
    .await;

    match insert {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = ?user.role, "User registered");
            Ok(user)
        }
        // Concurrent registration with the same email
        Err(err) if is_unique_violation(&err) => Err(AppError::Duplicate {
            message: "Email already registered".to_string(),
        }),
        Err(err) => Err(err.into()),
    }
}

/// Verify credentials and return the user.
///
/// The same error covers unknown email and wrong password; the plaintext is
/// seen only by the verification call and never logged.
pub async fn authenticate(db: &DbPool, email: &str, password: &str) -> Result<User> {
    let user = UserEntity::find()
        .filter(UserColumn::Email.eq(email))
        .one(db.conn())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

/// One-time admin provisioning, run from the `provision-admin` binary.
///
/// Idempotent: an existing admin with the same email short-circuits. An
/// existing non-admin account with that email is a hard conflict.
pub async fn provision_admin(
    db: &DbPool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    if let Some(existing) = UserEntity::find()
        .filter(UserColumn::Email.eq(email))
        .one(db.conn())
        .await?
    {
        return match existing.role {
            Role::Admin => Ok(existing),
            Role::Student | Role::Teacher => Err(AppError::Duplicate {
                message: format!("Email {} is taken by a non-admin account", email),
            }),
        };
    }

    let password_hash = auth::hash_password(password)?;

    let admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        role: Set(Role::Admin),
        password_hash: Set(password_hash),
        course_id: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.conn())
    .await?;

    tracing::info!(user_id = %admin.id, "Admin account provisioned");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_register_rejects_admin_role() {
        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = register(
            &db,
            RegisterInput {
                name: "Mallory".to_string(),
                email: "mallory@example.com".to_string(),
                password: "pw".to_string(),
                role: Role::Admin,
                course_id: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let existing = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::Student,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        };

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![existing]])
                .into_connection(),
        );

        let result = register(
            &db,
            RegisterInput {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "pw".to_string(),
                role: Role::Student,
                course_id: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email() {
        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<User>::new()])
                .into_connection(),
        );

        let result = authenticate(&db, "ghost@example.com", "pw").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_provision_admin_is_idempotent() {
        let existing = User {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            role: Role::Admin,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        };
        let expected_id = existing.id;

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![existing]])
                .into_connection(),
        );

        let admin = provision_admin(&db, "Admin", "admin@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(admin.id, expected_id);
    }
}
