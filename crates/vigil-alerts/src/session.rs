//! Reconciliation session state for the "apply to all systems" panel.
//!
//! A session remembers which systems already had a customized alert when the
//! panel was opened, so repeated applies leave them alone.
//!
//! ```text
//!                 first apply completes
//!   Discovering ─────────────────────────► Active
//!        ▲                                   │
//!        └─ exclusions cleared on every ─────┘
//!           apply made with overwrite set
//! ```
//!
//! While `Discovering`, the planner adds every system that has an existing
//! alert to the exclusion set and skips it. Once `Active`, excluded systems
//! are skipped and everything else is written. Overwrite empties the set,
//! which makes every system eligible again.

use std::collections::HashSet;

use tracing::debug;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// The first apply has not finished; existing alerts are being collected.
    Discovering,
    /// The exclusion set is populated.
    Active,
}

/// State kept between applies of one bulk alert panel.
#[derive(Debug, Clone)]
pub struct ReconciliationSession {
    phase: SessionPhase,
    excluded: HashSet<String>,
}

impl Default for ReconciliationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationSession {
    /// Creates a session that has not applied anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Discovering,
            excluded: HashSet::new(),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns true until the first apply has completed.
    #[must_use]
    pub const fn is_discovering(&self) -> bool {
        matches!(self.phase, SessionPhase::Discovering)
    }

    /// Returns true if `system_id` is excluded from non-overwrite applies.
    #[must_use]
    pub fn is_excluded(&self, system_id: &str) -> bool {
        self.excluded.contains(system_id)
    }

    /// Returns the number of excluded systems.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    /// Returns the excluded system ids, sorted.
    #[must_use]
    pub fn excluded(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.excluded.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Marks a system as already customized.
    ///
    /// Returns false if it was already excluded.
    pub fn exclude(&mut self, system_id: impl Into<String>) -> bool {
        self.excluded.insert(system_id.into())
    }

    /// Forgets every exclusion so all systems become eligible.
    pub fn clear_exclusions(&mut self) {
        if !self.excluded.is_empty() {
            debug!(count = self.excluded.len(), "clearing alert exclusions");
        }
        self.excluded.clear();
    }

    /// Records that an apply pass went through the whole target list.
    pub fn complete_pass(&mut self) {
        if self.is_discovering() {
            debug!(excluded = self.excluded.len(), "alert session discovery complete");
        }
        self.phase = SessionPhase::Active;
    }
}
