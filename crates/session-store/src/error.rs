//! Session error types.

use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The user record lacks a required field
    #[error("Invalid user record: {0}")]
    InvalidUser(String),

    /// Persisted storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] device_storage::StorageError),

    /// The persisted record is not a valid user
    #[error("Corrupt session record: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
