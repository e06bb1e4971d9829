//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache store and facade.
///
/// A missing or expired key is not an error: reads return `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Uniqueness conflict while writing a row
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The backing database failed or rejected a statement
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[source] sqlx::Error),

    /// The configured table is missing or has the wrong shape
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for errors that a create-or-update retry can resolve.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, CacheError::ConstraintViolation(_))
    }
}

// == Driver Error Conversion ==
impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CacheError::ConstraintViolation(db.message().to_string())
            }
            _ => CacheError::BackendUnavailable(err),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
