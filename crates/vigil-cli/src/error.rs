//! CLI error types.

use thiserror::Error;
use vigil_alerts::AlertError;
use vigil_store::StoreError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// The backend request failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// An alert operation was rejected.
    #[error("{0}")]
    Alert(#[from] AlertError),
    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Command execution failed.
    #[error("command error: {0}")]
    Command(String),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
