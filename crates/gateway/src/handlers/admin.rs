//! Administrative handlers: user and course management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use learntrack_common::{
    auth::AuthContext,
    db::Repository,
    errors::{AppError, Result},
    services::admin,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::handlers::auth::UserResponse;
use crate::handlers::courses::CourseResponse;

/// Request to create or rename a course
#[derive(Debug, Deserialize, Validate)]
pub struct CourseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// List every user
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<UserResponse>>> {
    auth.require_admin()?;

    let users = Repository::new(state.db.clone()).list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Delete a non-admin user and their dependent rows
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode> {
    admin::delete_user(&state.db, &auth.user, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a course
pub async fn create_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let course = admin::create_course(&state.db, &auth.user, &request.name).await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// Rename a course
pub async fn rename_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(course_id): Path<Uuid>,
    Json(request): Json<CourseRequest>,
) -> Result<Json<CourseResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let course = admin::rename_course(&state.db, &auth.user, course_id, &request.name).await?;
    Ok(Json(course.into()))
}

/// Delete a course and its classes (with their dependents)
pub async fn delete_course(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(course_id): Path<Uuid>,
) -> Result<StatusCode> {
    admin::delete_course(&state.db, &auth.user, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
