//! Error types for the vigil-store crate.

use thiserror::Error;

/// Errors returned by record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the backend.
        message: String,
    },

    /// The addressed record does not exist.
    #[error("record not found: {collection}/{id}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Record id that was not found.
        id: String,
    },

    /// The backend rejected the write.
    #[error("write rejected: {reason}")]
    Rejected {
        /// Why the write was rejected.
        reason: String,
    },

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record is missing required fields.
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// What is wrong with the record.
        reason: String,
    },

    /// The operation needs an authenticated user.
    #[error("not authenticated")]
    Unauthenticated,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
