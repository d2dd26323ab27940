//! User-facing notices.
//!
//! This module provides the [`Notifier`] trait and its implementations for
//! surfacing the outcome of background writes to the user.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Title of the notice sent when an alert write fails.
pub const ALERT_FAILED_TITLE: &str = "Failed to update alert";

/// Description of the notice sent when an alert write fails.
pub const ALERT_FAILED_DESCRIPTION: &str = "Please check logs for more details.";

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    /// Informational.
    #[default]
    Default,
    /// Something the user asked for did not happen.
    Destructive,
}

impl fmt::Display for NoticeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Destructive => write!(f, "destructive"),
        }
    }
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// One-line headline.
    pub title: String,
    /// Supporting text.
    pub description: String,
    /// Display severity.
    pub severity: NoticeSeverity,
}

impl Notice {
    /// Creates an informational notice.
    #[must_use]
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: NoticeSeverity::Default,
        }
    }

    /// Creates a destructive notice.
    #[must_use]
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: NoticeSeverity::Destructive,
        }
    }

    /// The notice sent for every failed alert write.
    #[must_use]
    pub fn alert_update_failed() -> Self {
        Self::destructive(ALERT_FAILED_TITLE, ALERT_FAILED_DESCRIPTION)
    }

    /// Returns true for destructive notices.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self.severity, NoticeSeverity::Destructive)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Delivers notices to the user.
///
/// Called from queued tasks, so implementations must not block.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Shows a notice.
    fn notify(&self, notice: Notice);
}

/// Writes notices to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            NoticeSeverity::Destructive => {
                warn!(title = %notice.title, description = %notice.description, "notice");
            }
            NoticeSeverity::Default => {
                info!(title = %notice.title, description = %notice.description, "notice");
            }
        }
    }
}

/// Collects notices in memory.
///
/// Used by the CLI to summarize a run and by tests to assert on what the
/// user would have seen.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notice received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Returns the number of notices received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    /// Returns true if no notice was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }

    /// Returns the number of destructive notices received.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.is_destructive())
            .count()
    }

    /// Removes and returns every notice.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Forwards each notice to two notifiers.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    /// Combines two notifiers.
    pub const fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Notifier, B: Notifier> Notifier for Tee<A, B> {
    fn notify(&self, notice: Notice) {
        self.first.notify(notice.clone());
        self.second.notify(notice);
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}
