//! Error types for the studyplan-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A student with this username is already registered.
    #[error("username already taken: {0}")]
    DuplicateUsername(String),

    /// An invalid argument was provided to a store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Salt generation or hash decoding failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A blocking task was cancelled or panicked, or the store lock was poisoned.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
