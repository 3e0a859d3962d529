//! Error types for the client.

use listsync_gateway::GatewayError;
use listsync_services::ServiceError;
use listsync_store::StoreError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Store error (includes rolled-back mutations).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Gateway error outside any store, e.g. opening a database.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Auth or upload backend error.
    #[error("service error: {0}")]
    Service(ServiceError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    Unauthenticated,
}

impl From<ServiceError> for ClientError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Unauthenticated => ClientError::Unauthenticated,
            other => ClientError::Service(other),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
