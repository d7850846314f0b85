//! Error types for checkpoint and store operations

use thiserror::Error;

/// Errors produced by checkpoint savers and stores
#[derive(Error, Debug)]
pub enum StorageError {
    /// A requested checkpoint does not exist
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed (directory creation, file access)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure that does not fit the other variants
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
