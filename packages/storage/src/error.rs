//! Error types for the storage facade.

use thiserror::Error;

/// Errors surfaced by storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backing store reported a failure for the operation.
    #[error("storage transport error: {message}")]
    Transport { message: String },

    /// A namespace prefix must be non-empty.
    #[error("invalid key prefix: {0:?}")]
    InvalidPrefix(String),

    /// The keys argument is not valid for the operation.
    #[error("invalid keys: {message}")]
    InvalidKeys { message: String },
}

impl StorageError {
    pub fn transport(message: impl Into<String>) -> Self {
        StorageError::Transport {
            message: message.into(),
        }
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
