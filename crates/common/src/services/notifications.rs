//! Notification read-state
//!
//! Marking read is a recipient-only, single-row mutation. A notification
//! owned by someone else answers with the same not-found shape as a missing
//! one, so callers cannot probe for existence.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use uuid::Uuid;

/// Mark one of the requester's notifications as read
pub async fn mark_read(db: &DbPool, requester: &User, notification_id: Uuid) -> Result<()> {
    let notification = NotificationEntity::find_by_id(notification_id)
        .one(db.conn())
        .await?
        .filter(|n| n.user_id == requester.id)
        .ok_or_else(|| AppError::NotificationNotFound {
            id: notification_id.to_string(),
        })?;

    if notification.is_read {
        return Ok(());
    }

    let mut active = notification.into_active_model();
    active.is_read = Set(true);
    active.update(db.conn()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn reader() -> User {
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

    #[tokio::test]
    async fn test_foreign_notification_reads_as_missing() {
        let alice = reader();
        let someone_elses = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            message: "not yours".to_string(),
            link: None,
            is_read: false,
            timestamp: Utc::now().into(),
            kind: NotificationKind::Info,
        };
        let id = someone_elses.id;

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![someone_elses]])
                .into_connection(),
        );

        let result = mark_read(&db, &alice, id).await;
        assert!(matches!(result, Err(AppError::NotificationNotFound { .. })));
    }

    #[tokio::test]
    async fn test_already_read_is_a_no_op() {
        let alice = reader();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: alice.id,
            message: "seen".to_string(),
            link: None,
            is_read: true,
            timestamp: Utc::now().into(),
            kind: NotificationKind::Info,
        };
        let id = notification.id;

        let db = DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![notification]])
                .into_connection(),
        );

        assert!(mark_read(&db, &alice, id).await.is_ok());
    }
}
