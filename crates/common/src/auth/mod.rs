//! Authentication and authorization utilities
//!
//! Provides:
//! - Password hashing and verification (opaque credential capability)
//! - JWT token generation and validation
//! - Authenticated-user context extraction

use crate::db::models::{user, Role};
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated actor available to handlers
///
/// Inserted by the auth middleware after the bearer token is validated and
/// the user row is resolved, so role checks always see the live role.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated user row
    pub user: user::Model,

    /// Request ID for tracing
    pub request_id: String,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Require the teacher role, returning Forbidden if not present
    pub fn require_teacher(&self) -> Result<()> {
        match self.user.role {
            Role::Teacher => Ok(()),
            Role::Student | Role::Admin => Err(AppError::Forbidden {
                message: "Teacher role required".to_string(),
            }),
        }
    }

    /// Require the student role, returning Forbidden if not present
    pub fn require_student(&self) -> Result<()> {
        match self.user.role {
            Role::Student => Ok(()),
            Role::Teacher | Role::Admin => Err(AppError::Forbidden {
                message: "Student role required".to_string(),
            }),
        }
    }

    /// Require the admin role, returning Forbidden if not present
    pub fn require_admin(&self) -> Result<()> {
        match self.user.role {
            Role::Admin => Ok(()),
            Role::Student | Role::Teacher => Err(AppError::Forbidden {
                message: "Admin access required".to_string(),
            }),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Role at token issue time (informational; authorization re-reads the row)
    pub role: Role,

    /// Display name
    pub name: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.to_string(),
            role: user.role,
            name: user.name.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::Unauthorized {
                    message: "Invalid token".to_string(),
                },
            })
    }
}

/// Hash a plaintext password for storage
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a plaintext password against a stored hash
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for AuthContext
///
/// The auth middleware places the context in request extensions; a missing
/// entry means the route was reached without authentication.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing authentication".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::prelude::DateTimeWithTimeZone;

    fn test_user(role: Role) -> user::Model {
        let now: DateTimeWithTimeZone = Utc::now().into();
        user::Model {
            id: Uuid::new_v4(),
            email: "carol@example.com".to_string(),
            name: "Carol".to_string(),
            role,
            password_hash: "x".to_string(),
            course_id: None,
            created_at: now,
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret!").unwrap();
        assert_ne!(hash, "s3cret!");
        assert!(verify_password("s3cret!", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("abc.def.ghi"), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let user = test_user(Role::Teacher);

        let token = manager.generate_token(&user).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Teacher);
        assert_eq!(claims.name, "Carol");
    }

    #[test]
    fn test_role_requirements() {
        let ctx = AuthContext {
            user: test_user(Role::Student),
            request_id: "r1".to_string(),
        };
        assert!(ctx.require_student().is_ok());
        assert!(ctx.require_teacher().is_err());
        assert!(ctx.require_admin().is_err());

        let ctx = AuthContext {
            user: test_user(Role::Admin),
            request_id: "r2".to_string(),
        };
        assert!(ctx.require_admin().is_ok());
        // Admin does not implicitly pass teacher/student checks
        assert!(ctx.require_teacher().is_err());
    }
}
