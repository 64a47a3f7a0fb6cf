//! Error types for bucket

use thiserror::Error;

/// Result type alias for bucket operations
pub type Result<T> = std::result::Result<T, BucketError>;

/// Error types for bucket operations
#[derive(Debug, Error)]
pub enum BucketError {
    /// Rejected argument, reported before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Failure inside the disk cache
    #[error(transparent)]
    Store(#[from] bucketstore::Error),

    /// Value could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<serde_json::Error> for BucketError {
    fn from(err: serde_json::Error) -> Self {
        BucketError::Codec(Box::new(err))
    }
}
