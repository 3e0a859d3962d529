//! Error types for the store module.

use std::time::Duration;

use listsync_core::{now_millis, CoreError, RecordId};
use listsync_gateway::GatewayError;
use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The gateway call failed. The optimistic change has been rolled back.
    #[error("remote error: {0}")]
    Remote(#[from] GatewayError),

    /// Another mutation on this record is still in flight.
    #[error("mutation already in flight for record {id}")]
    MutationConflict { id: RecordId },

    /// The record is not in the snapshot.
    #[error("record not in snapshot: {id}")]
    NotFound { id: RecordId },

    /// A refresh failed. The snapshot was left untouched.
    #[error("{0}")]
    Load(LoadError),

    /// The gateway call did not resolve in time. Treated as a failure.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A server record did not match the entity shape.
    #[error("decode error: {0}")]
    Decode(#[from] CoreError),

    /// The store was closed; late results are discarded.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Whether this failure came from (or timed out on) the remote side.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StoreError::Remote(_) | StoreError::Timeout { .. } | StoreError::Load(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::MutationConflict { .. })
    }
}

/// The last refresh failure, kept in the store state for the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("load failed: {message}")]
pub struct LoadError {
    pub message: String,
    /// When the failure was recorded (Unix ms).
    pub failed_at: i64,
}

impl LoadError {
    pub fn from_error(error: &StoreError) -> Self {
        Self {
            message: error.to_string(),
            failed_at: now_millis(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
