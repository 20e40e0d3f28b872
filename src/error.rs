//! Application error taxonomy.
//!
//! Every failure a caller can observe maps to one of these kinds with a
//! stable message. Raw store errors are carried in the message for logs but
//! callers are expected to map kinds, not parse text.

use thiserror::Error;

use crate::content::ContentError;

#[derive(Debug, Error)]
pub enum AppError {
    /// A referenced entity (thread, comment, category, parent comment) is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// An authorization rule was violated (locked thread, non-owner edit, ...).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A uniqueness constraint was violated (duplicate slug, category name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected by a business rule. Shape validation happens upstream.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A backing store is unreachable, timed out, or returned an internal error.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl AppError {
    /// Shorthand for a `NotFound` describing an entity and its id.
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_string());
            }
        }
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::AlreadyExists(id) => {
                Self::Conflict(format!("content document {id} already exists"))
            }
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

/// Result alias for forum operations.
pub type Result<T> = std::result::Result<T, AppError>;
