//! Direct messaging handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use learntrack_common::{
    auth::AuthContext,
    db::models::{Message, Role},
    db::Repository,
    errors::{AppError, Result},
    services::messaging,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

/// Request to send a direct message
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,

    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub timestamp: String,
    pub is_read: bool,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp: message.timestamp.to_rfc3339(),
            is_read: message.is_read,
        }
    }
}

/// A user the caller can chat with, with their unread count
#[derive(Serialize)]
pub struct ChatPartnerResponse {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub unread: u64,
}

/// Send a direct message
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let message =
        messaging::send_message(&state.db, &auth.user, request.receiver_id, &request.content)
            .await?;

    Ok((StatusCode::CREATED, Json(message.into())))
}

/// Both directions of the conversation with another user, oldest first
pub async fn conversation(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>> {
    let messages = Repository::new(state.db.clone())
        .conversation(auth.user_id(), user_id)
        .await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Users the caller may chat with
pub async fn chat_partners(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ChatPartnerResponse>>> {
    let partners = messaging::chat_partners(&state.db, &auth.user).await?;

    Ok(Json(
        partners
            .into_iter()
            .map(|p| ChatPartnerResponse {
                id: p.user.id,
                name: p.user.name,
                role: p.user.role,
                unread: p.unread,
            })
            .collect(),
    ))
}

/// Mark every message from the given user to the caller as read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode> {
    messaging::mark_conversation_read(&state.db, &auth.user, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
