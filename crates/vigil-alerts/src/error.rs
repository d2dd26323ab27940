//! Error types for the vigil-alerts crate.

use thiserror::Error;
use vigil_queue::QueueError;
use vigil_store::StoreError;

/// Errors that can occur while editing or synchronizing alerts.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The requested threshold is outside the accepted range.
    #[error("invalid threshold: {reason}")]
    InvalidThreshold {
        /// Why the threshold was rejected.
        reason: String,
    },

    /// The alert kind name is not recognized.
    #[error("unknown alert kind: {name}")]
    UnknownKind {
        /// The name that was not recognized.
        name: String,
    },

    /// A system registration is missing required fields.
    #[error("invalid system: {reason}")]
    InvalidSystem {
        /// Why the system was rejected.
        reason: String,
    },

    /// The record store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The work queue could not be built.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
