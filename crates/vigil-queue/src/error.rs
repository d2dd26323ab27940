//! Error types for the vigil-queue crate.

use thiserror::Error;

/// Queue-level outcomes that are not the task's own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A queue cannot be built with room for zero running tasks.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,

    /// The task was removed from the queue before it started.
    #[error("task was cancelled before it started")]
    Cancelled,

    /// The task panicked while running.
    #[error("task panicked")]
    Panicked,
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_zero_capacity() {
        assert_eq!(
            QueueError::ZeroCapacity.to_string(),
            "queue capacity must be at least 1"
        );
    }

    #[test]
    fn error_display_cancelled() {
        assert_eq!(
            QueueError::Cancelled.to_string(),
            "task was cancelled before it started"
        );
    }

    #[test]
    fn error_display_panicked() {
        assert_eq!(QueueError::Panicked.to_string(), "task panicked");
    }
}
