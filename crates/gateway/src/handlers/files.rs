//! File upload and download handlers
//!
//! Uploads are validated (extension allowlist, size cap) before storage and
//! answered with an opaque reference; assignments and submissions carry the
//! reference.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use learntrack_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    storage::FileStore,
};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub reference: String,
}

/// Store an uploaded file and return its reference
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidFormat {
            message: format!("Malformed multipart body: {}", e),
        })?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(String::from)
            .ok_or_else(|| AppError::MissingField {
                field: "file.filename".to_string(),
            })?;

        let bytes = field.bytes().await.map_err(|e| AppError::InvalidFormat {
            message: format!("Failed to read upload: {}", e),
        })?;

        let reference = state.files.put(&bytes, &original_name).await?;

        tracing::info!(
            reference = %reference,
            user_id = %auth.user_id(),
            size = bytes.len(),
            "File uploaded"
        );

        return Ok((StatusCode::CREATED, Json(UploadResponse { reference })));
    }

    Err(AppError::MissingField {
        field: "file".to_string(),
    })
}

/// Fetch a stored file by reference
pub async fn download(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = state.files.get(&reference).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", reference),
            ),
        ],
        bytes,
    ))
}
