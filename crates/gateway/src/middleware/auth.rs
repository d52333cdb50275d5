//! Bearer-token authentication middleware
//!
//! Validates the JWT and resolves the live user row into request
//! extensions, so downstream role checks never trust stale claims.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use learntrack_common::{
    auth::{extract_bearer_token, AuthContext},
    db::Repository,
    errors::AppError,
};
use uuid::Uuid;

use crate::AppState;

/// Authenticate the request and attach the actor to its extensions
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing Authorization header".to_string(),
        })?;

    let token = extract_bearer_token(auth_header).ok_or_else(|| AppError::Unauthorized {
        message: "Expected a bearer token".to_string(),
    })?;

    let claims = state.jwt.validate_token(token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized {
        message: "Invalid token subject".to_string(),
    })?;

    // The account may have been deleted since the token was issued
    let user = Repository::new(state.db.clone())
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            message: "Unknown user".to_string(),
        })?;

    request.extensions_mut().insert(AuthContext { user, request_id });

    Ok(next.run(request).await)
}
