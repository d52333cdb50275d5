//! File storage boundary
//!
//! The core stores bytes and hands back an opaque reference; assignments
//! and submissions carry the reference, never a filesystem path. Uploads
//! are validated before anything touches disk, and references get a random
//! suffix so concurrent uploads with identical names never collide.

use crate::config::UploadConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

/// File extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "doc", "docx", "jpg", "jpeg", "png", "gif"];

/// Opaque byte storage: put returns a reference, get resolves one
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, bytes: &[u8], original_name: &str) -> Result<String>;
    async fn get(&self, reference: &str) -> Result<Vec<u8>>;
}

/// Local-disk file store
pub struct LocalFileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalFileStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            max_bytes: config.max_bytes,
        }
    }

    /// Create the upload directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, bytes: &[u8], original_name: &str) -> Result<String> {
        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let (stem, extension) = split_allowed(original_name)?;
        let nonce = Uuid::new_v4().simple().to_string();
        let reference = format!("{}_{}.{}", stem, &nonce[..8], extension);

        tokio::fs::write(self.root.join(&reference), bytes).await?;

        tracing::debug!(reference = %reference, size = bytes.len(), "File stored");
        Ok(reference)
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>> {
        // References are flat names; anything path-like is treated as absent
        if reference.is_empty()
            || reference.contains('/')
            || reference.contains('\\')
            || reference.contains("..")
        {
            return Err(AppError::FileNotFound {
                reference: reference.to_string(),
            });
        }

        tokio::fs::read(self.root.join(reference))
            .await
            .map_err(|_| AppError::FileNotFound {
                reference: reference.to_string(),
            })
    }
}

/// Validate the extension allowlist and produce a sanitized stem
fn split_allowed(original_name: &str) -> Result<(String, String)> {
    let (stem, extension) = match original_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => {
            return Err(AppError::InvalidFileType {
                extension: String::new(),
            })
        }
    };

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::InvalidFileType { extension });
    }

    Ok((sanitize_stem(stem), extension))
}

/// Keep references filesystem- and URL-safe
fn sanitize_stem(stem: &str) -> String {
    let mut cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.truncate(64);
    if cleaned.is_empty() {
        cleaned.push_str("upload");
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_bytes: usize) -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(&UploadConfig {
            dir: dir.path().to_string_lossy().into_owned(),
            max_bytes,
        });
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (_dir, store) = store(1024);

        let reference = store.put(b"homework text", "essay.txt").await.unwrap();
        assert!(reference.starts_with("essay_"));
        assert!(reference.ends_with(".txt"));

        let bytes = store.get(&reference).await.unwrap();
        assert_eq!(bytes, b"homework text");
    }

    #[tokio::test]
    async fn test_same_name_yields_distinct_references() {
        let (_dir, store) = store(1024);

        let first = store.put(b"a", "hw.pdf").await.unwrap();
        let second = store.put(b"b", "hw.pdf").await.unwrap();
        assert_ne!(first, second);

        assert_eq!(store.get(&first).await.unwrap(), b"a");
        assert_eq!(store.get(&second).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_rejects_disallowed_extension() {
        let (_dir, store) = store(1024);

        let result = store.put(b"#!/bin/sh", "payload.sh").await;
        assert!(matches!(result, Err(AppError::InvalidFileType { .. })));

        let result = store.put(b"data", "no_extension").await;
        assert!(matches!(result, Err(AppError::InvalidFileType { .. })));
    }

    #[tokio::test]
    async fn test_rejects_oversized_payload() {
        let (_dir, store) = store(4);

        let result = store.put(b"12345", "note.txt").await;
        assert!(matches!(result, Err(AppError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_get_rejects_path_traversal() {
        let (_dir, store) = store(1024);

        for reference in ["../secret.txt", "a/b.txt", "..", ""] {
            let result = store.get(reference).await;
            assert!(matches!(result, Err(AppError::FileNotFound { .. })));
        }
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("my homework (1)"), "my_homework__1_");
        assert_eq!(sanitize_stem(""), "upload");
    }
}
