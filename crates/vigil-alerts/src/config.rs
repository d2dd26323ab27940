//! Synchronization settings.

use serde::{Deserialize, Serialize};
use vigil_queue::{DEFAULT_CONCURRENCY, WorkQueue};

use crate::error::Result;

/// Settings for bulk alert synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of alert writes in flight at once.
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SyncConfig {
    /// Sets the concurrency limit.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Builds the work queue these settings describe.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Queue` if the concurrency is zero.
    pub fn build_queue(&self) -> Result<WorkQueue> {
        Ok(WorkQueue::new(self.concurrency)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertError;
    use vigil_queue::QueueError;

    #[test]
    fn default_matches_queue_default() {
        assert_eq!(SyncConfig::default().concurrency, 5);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = SyncConfig::default().with_concurrency(0).build_queue().unwrap_err();
        assert!(matches!(err, AlertError::Queue(QueueError::ZeroCapacity)));
    }
}
