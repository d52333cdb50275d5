//! Domain operations
//!
//! Each operation runs its entity mutation and the derived notification
//! inserts inside a single transaction; a rejected operation leaves zero
//! partial state. Pre-condition checks (role, ownership, existence) run
//! before any mutation begins.

pub mod accounts;
pub mod admin;
pub mod assignments;
pub mod classes;
pub mod messaging;
pub mod notifications;

use sea_orm::{DbErr, SqlErr};

/// Storage-level uniqueness races are translated to idempotent outcomes,
/// never surfaced as hard failures (see enrollment and submission flows).
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
