//! Registration and login handlers

use axum::{extract::State, http::StatusCode, Json};
use learntrack_common::{
    db::models::{Role, User},
    errors::{AppError, Result},
    services::accounts::{self, RegisterInput},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

/// Request to register a new account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    /// student or teacher; admin accounts are provisioned out of band
    pub role: Role,

    /// Course binding for students
    #[serde(default)]
    pub course_id: Option<Uuid>,
}

/// Request to log in
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub course_id: Option<Uuid>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            course_id: user.course_id,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Register a new student or teacher account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let user = accounts::register(
        &state.db,
        RegisterInput {
            name: request.name,
            email: request.email,
            password: request.password,
            role: request.role,
            course_id: request.course_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Verify credentials and issue a token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let user = accounts::authenticate(&state.db, &request.email, &request.password).await?;
    let token = state.jwt.generate_token(&user)?;

    tracing::info!(user_id = %user.id, "Login succeeded");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}
