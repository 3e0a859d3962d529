//! Error types for the gateway module.

use listsync_core::RecordId;
use thiserror::Error;

/// Errors a gateway call can fail with.
///
/// Every variant is recoverable: callers may retry the same call later.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The record does not exist (or no longer exists) remotely.
    #[error("{entity} record not found: {id}")]
    NotFound { entity: String, id: RecordId },

    /// The backend refused the write (validation and the like).
    #[error("rejected by backend: {0}")]
    Rejected(String),

    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
