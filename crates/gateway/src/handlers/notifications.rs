//! Notification handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use learntrack_common::{
    auth::AuthContext,
    db::models::{Notification, NotificationKind},
    db::Repository,
    errors::Result,
    services::notifications,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            message: notification.message,
            link: notification.link,
            is_read: notification.is_read,
            timestamp: notification.timestamp.to_rfc3339(),
            kind: notification.kind,
        }
    }
}

/// The caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<NotificationResponse>>> {
    let notifications = Repository::new(state.db.clone())
        .list_notifications(auth.user_id())
        .await?;

    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

/// Mark one of the caller's notifications as read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode> {
    notifications::mark_read(&state.db, &auth.user, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
