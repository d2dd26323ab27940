//! Reconciliation policy.
//!
//! Decides, per target system, whether an alert record must be created,
//! updated, deleted, or left alone. Planning is synchronous and mutates the
//! [`ReconciliationSession`] before any request is issued, so a second apply
//! started while the first one's writes are still in flight sees a
//! consistent exclusion set.

use serde_json::{Value, json};
use tracing::{debug, trace};
use vigil_store::{AlertRecord, SystemRecord};

use crate::session::ReconciliationSession;
use crate::types::{AlertKind, AlertThreshold};

/// The "overwrite existing alerts" checkbox.
///
/// `Indeterminate` behaves like `No`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Overwrite {
    /// Overwrite alerts that were customized per system.
    Yes,
    /// Keep customized alerts.
    #[default]
    No,
    /// Mixed state; treated as `No`.
    Indeterminate,
}

impl Overwrite {
    /// Returns true only for `Overwrite::Yes`.
    #[must_use]
    pub const fn is_set(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for Overwrite {
    fn from(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }
}

impl From<Option<bool>> for Overwrite {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Indeterminate, Self::from)
    }
}

/// One write against the alert collection.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    /// Create a new alert record.
    Create {
        /// Target system.
        system_id: String,
        /// Alert kind.
        kind: AlertKind,
        /// Threshold value.
        value: f64,
        /// Sustained duration in minutes.
        min: u32,
    },
    /// Update an existing alert record.
    Update {
        /// Target system.
        system_id: String,
        /// Record to update.
        alert_id: String,
        /// New threshold value.
        value: f64,
        /// New sustained duration in minutes.
        min: u32,
    },
    /// Delete an existing alert record.
    Delete {
        /// Target system.
        system_id: String,
        /// Record to delete.
        alert_id: String,
    },
}

impl AlertAction {
    /// Returns the system this action targets.
    #[must_use]
    pub fn system_id(&self) -> &str {
        match self {
            Self::Create { system_id, .. }
            | Self::Update { system_id, .. }
            | Self::Delete { system_id, .. } => system_id,
        }
    }

    /// Key under which a newer request supersedes an older one.
    #[must_use]
    pub fn request_key(&self) -> &str {
        self.system_id()
    }

    /// Returns a short verb for logs.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }

    /// Fields sent with a create or update. Deletes carry no body.
    ///
    /// Every write resets `triggered`. Creates are owned by `user_id`.
    #[must_use]
    pub fn fields(&self, user_id: &str) -> Option<Value> {
        match self {
            Self::Create {
                system_id,
                kind,
                value,
                min,
            } => Some(json!({
                "system": system_id,
                "user": user_id,
                "name": kind.as_str(),
                "value": value,
                "min": min,
                "triggered": false,
            })),
            Self::Update { value, min, .. } => Some(json!({
                "value": value,
                "min": min,
                "triggered": false,
            })),
            Self::Delete { .. } => None,
        }
    }
}

/// Why a system got no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The system was already in the exclusion set.
    Excluded,
    /// The system was found to have an existing alert during discovery.
    Discovered,
}

/// Outcome of planning one apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Writes to issue, in target-list order.
    pub actions: Vec<AlertAction>,
    /// Systems skipped by the exclusion rules, in target-list order.
    pub skipped: Vec<(String, SkipReason)>,
    /// Systems that needed nothing (disabled with no existing alert).
    pub unchanged: usize,
}

impl Plan {
    /// Returns true if nothing will be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Counts planned actions by verb: `(create, update, delete)`.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        self.actions
            .iter()
            .fold((0, 0, 0), |(c, u, d), action| match action {
                AlertAction::Create { .. } => (c + 1, u, d),
                AlertAction::Update { .. } => (c, u + 1, d),
                AlertAction::Delete { .. } => (c, u, d + 1),
            })
    }
}

/// Finds the alert of `kind` on `system_id` in a snapshot.
#[must_use]
pub fn find_alert<'a>(
    alerts: &'a [AlertRecord],
    system_id: &str,
    kind: AlertKind,
) -> Option<&'a AlertRecord> {
    alerts
        .iter()
        .find(|alert| alert.system == system_id && alert.name == kind.as_str())
}

/// Decides the write for one system given its existing alert.
///
/// | desired  | existing | action |
/// |----------|----------|--------|
/// | enabled  | yes      | update |
/// | enabled  | no       | create |
/// | disabled | yes      | delete |
/// | disabled | no       | none   |
#[must_use]
pub fn decide_single(
    system_id: &str,
    kind: AlertKind,
    desired: &AlertThreshold,
    existing: Option<&AlertRecord>,
) -> Option<AlertAction> {
    let (value, min) = desired.written_fields(kind);

    match (desired.enabled, existing) {
        (true, Some(alert)) => Some(AlertAction::Update {
            system_id: system_id.to_string(),
            alert_id: alert.id.clone(),
            value,
            min,
        }),
        (true, None) => Some(AlertAction::Create {
            system_id: system_id.to_string(),
            kind,
            value,
            min,
        }),
        (false, Some(alert)) => Some(AlertAction::Delete {
            system_id: system_id.to_string(),
            alert_id: alert.id.clone(),
        }),
        (false, None) => None,
    }
}

/// Plans one "apply to all systems" pass.
///
/// Walks `systems` in order against the `alerts` snapshot, applying the
/// exclusion rules held in `session`, and leaves the session `Active`.
pub fn plan(
    kind: AlertKind,
    desired: &AlertThreshold,
    systems: &[SystemRecord],
    alerts: &[AlertRecord],
    overwrite: Overwrite,
    session: &mut ReconciliationSession,
) -> Plan {
    let overwrite = overwrite.is_set();
    if overwrite {
        session.clear_exclusions();
    }

    let mut plan = Plan::default();

    for system in systems {
        if !overwrite && session.is_excluded(&system.id) {
            trace!(system_id = %system.id, "skipping excluded system");
            plan.skipped.push((system.id.clone(), SkipReason::Excluded));
            continue;
        }

        let existing = find_alert(alerts, &system.id, kind);

        if existing.is_some() && session.is_discovering() && !overwrite {
            trace!(system_id = %system.id, "found customized alert");
            session.exclude(system.id.as_str());
            plan.skipped.push((system.id.clone(), SkipReason::Discovered));
            continue;
        }

        match decide_single(&system.id, kind, desired, existing) {
            Some(action) => plan.actions.push(action),
            None => plan.unchanged += 1,
        }
    }

    session.complete_pass();

    let (create, update, delete) = plan.counts();
    debug!(
        kind = %kind,
        enabled = desired.enabled,
        overwrite,
        create,
        update,
        delete,
        skipped = plan.skipped.len(),
        "planned alert sync"
    );

    plan
}
