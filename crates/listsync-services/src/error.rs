//! Error types for the services module.

use thiserror::Error;

/// Errors from authentication or upload collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No user is signed in.
    #[error("not authenticated")]
    Unauthenticated,

    /// The upload was refused.
    #[error("upload rejected: {0}")]
    UploadRejected(String),

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
