//! Error types for listsync core.

use thiserror::Error;

/// Errors that can occur while converting or describing records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot decode {entity} record: {message}")]
    Decode {
        entity: &'static str,
        message: String,
    },

    #[error("cannot encode {entity} value: {message}")]
    Encode {
        entity: &'static str,
        message: String,
    },

    #[error("invalid order key: {0:?}")]
    InvalidOrderKey(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
