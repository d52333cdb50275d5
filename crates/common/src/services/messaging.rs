//! Direct messaging between permitted role pairs
//!
//! Students may message teachers only; teachers and admins may message
//! anyone except themselves.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

/// The messaging permission matrix
pub fn can_message(sender: Role, receiver: Role) -> bool {
    match sender {
        Role::Admin | Role::Teacher => true,
        Role::Student => receiver.is_teacher(),
    }
}

/// Send a direct message
pub async fn send_message(
    db: &DbPool,
    sender: &User,
    receiver_id: Uuid,
    content: &str,
) -> Result<Message> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation {
            message: "Message content must not be empty".to_string(),
            field: Some("content".to_string()),
        });
    }

    if receiver_id == sender.id {
        return Err(AppError::Validation {
            message: "Cannot send a message to yourself".to_string(),
            field: Some("receiver_id".to_string()),
        });
    }

    let receiver = UserEntity::find_by_id(receiver_id)
        .one(db.conn())
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            id: receiver_id.to_string(),
        })?;

    if !can_message(sender.role, receiver.role) {
        return Err(AppError::Forbidden {
            message: "Students can only chat with teachers".to_string(),
        });
    }

    let message = message::ActiveModel {
        id: Set(Uuid::new_v4()),
        sender_id: Set(sender.id),
        receiver_id: Set(receiver.id),
        content: Set(content.to_string()),
        timestamp: Set(Utc::now().into()),
        is_read: Set(false),
    }
    .insert(db.conn())
    .await?;

    tracing::debug!(
        message_id = %message.id,
        sender_id = %sender.id,
        receiver_id = %receiver.id,
        "Message sent"
    );

    Ok(message)
}

/// A potential chat partner with the caller's unread count from them
#[derive(Debug, Clone)]
pub struct ChatPartner {
    pub user: User,
    pub unread: u64,
}

/// Users the caller may start a conversation with.
///
/// Admins and teachers see everyone but themselves; students see teachers.
pub async fn chat_partners(db: &DbPool, me: &User) -> Result<Vec<ChatPartner>> {
    let repo = crate::db::Repository::new(db.clone());

    let users = match me.role {
        Role::Admin | Role::Teacher => repo.list_users_except(me.id).await?,
        Role::Student => repo.list_users_by_role(Role::Teacher).await?,
    };

    let mut partners = Vec::with_capacity(users.len());
    for user in users {
        let unread = repo.unread_count_from(user.id, me.id).await?;
        partners.push(ChatPartner { user, unread });
    }

    Ok(partners)
}

/// Mark every message from `other_id` to the caller as read
pub async fn mark_conversation_read(db: &DbPool, me: &User, other_id: Uuid) -> Result<()> {
    MessageEntity::update_many()
        .col_expr(MessageColumn::IsRead, sea_orm::sea_query::Expr::value(true))
        .filter(MessageColumn::SenderId.eq(other_id))
        .filter(MessageColumn::ReceiverId.eq(me.id))
        .filter(MessageColumn::IsRead.eq(false))
        .exec(db.conn())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matrix() {
        // Students reach teachers only
        assert!(can_message(Role::Student, Role::Teacher));
        assert!(!can_message(Role::Student, Role::Student));
        assert!(!can_message(Role::Student, Role::Admin));

        // Teachers and admins reach anyone
        for receiver in [Role::Student, Role::Teacher, Role::Admin] {
            assert!(can_message(Role::Teacher, receiver));
            assert!(can_message(Role::Admin, receiver));
        }
    }

    #[tokio::test]
    async fn test_send_rejects_empty_content() {
        let db = crate::db::DbPool::from_connection(
            sea_orm::MockDatabase::new(sea_orm::DatabaseBackend::Postgres).into_connection(),
        );
        let alice = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::Student,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        };

        let result = send_message(&db, &alice, Uuid::new_v4(), "   ").await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_send_rejects_self_message() {
        let db = crate::db::DbPool::from_connection(
            sea_orm::MockDatabase::new(sea_orm::DatabaseBackend::Postgres).into_connection(),
        );
        let alice = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: Role::Teacher,
            password_hash: String::new(),
            course_id: None,
            created_at: Utc::now().into(),
        };

        let result = send_message(&db, &alice, alice.id, "hi me").await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
