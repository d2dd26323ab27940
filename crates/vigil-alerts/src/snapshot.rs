//! Point-in-time view of systems and alerts.

use tracing::debug;
use vigil_store::{AlertRecord, Filter, RecordStore, SystemRecord, records};

use crate::error::Result;
use crate::policy::find_alert;
use crate::types::AlertKind;

/// Systems and alerts as last read from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Every visible system.
    pub systems: Vec<SystemRecord>,
    /// Every visible alert.
    pub alerts: Vec<AlertRecord>,
}

impl Snapshot {
    /// Creates a snapshot from already-loaded records.
    #[must_use]
    pub const fn new(systems: Vec<SystemRecord>, alerts: Vec<AlertRecord>) -> Self {
        Self { systems, alerts }
    }

    /// Finds the alert of `kind` on `system_id`.
    #[must_use]
    pub fn find(&self, system_id: &str, kind: AlertKind) -> Option<&AlertRecord> {
        find_alert(&self.alerts, system_id, kind)
    }

    /// Finds a system by id.
    #[must_use]
    pub fn system(&self, system_id: &str) -> Option<&SystemRecord> {
        self.systems.iter().find(|s| s.id == system_id)
    }

    /// Alerts on one system.
    pub fn alerts_for<'a>(&'a self, system_id: &'a str) -> impl Iterator<Item = &'a AlertRecord> {
        self.alerts.iter().filter(move |a| a.system == system_id)
    }

    /// Keeps only the systems whose id is in `ids`, in snapshot order.
    ///
    /// An empty `ids` keeps every system.
    #[must_use]
    pub fn restrict_to(mut self, ids: &[String]) -> Self {
        if !ids.is_empty() {
            self.systems.retain(|s| ids.contains(&s.id));
        }
        self
    }
}

/// Reads every system and alert once.
///
/// # Errors
///
/// Returns `AlertError::Store` if either list fails or a record cannot be
/// decoded.
pub async fn load_snapshot(store: &dyn RecordStore) -> Result<Snapshot> {
    let all = Filter::all();
    let systems: Vec<SystemRecord> =
        records::decode_all(store.list(records::SYSTEMS, &all).await?)?;
    let alerts: Vec<AlertRecord> = records::decode_all(store.list(records::ALERTS, &all).await?)?;

    debug!(systems = systems.len(), alerts = alerts.len(), "loaded snapshot");
    Ok(Snapshot { systems, alerts })
}
