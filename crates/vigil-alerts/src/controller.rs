//! Alert editors.
//!
//! [`GlobalAlertController`] backs the "apply to all systems" panel for one
//! alert kind: it owns a [`ReconciliationSession`] and pushes every planned
//! write through the dispatcher's queue. [`SystemAlertController`] backs the
//! editor of a single system and writes directly.

use tracing::{debug, info};
use vigil_queue::TaskHandle;
use vigil_store::AlertRecord;

use crate::dispatch::{AlertDispatcher, WriteOutcome};
use crate::error::Result;
use crate::policy::{self, AlertAction, Overwrite, Plan};
use crate::session::ReconciliationSession;
use crate::snapshot::Snapshot;
use crate::types::{AlertForm, AlertKind, AlertThreshold};

/// Bulk editor for one alert kind across every system in a snapshot.
#[derive(Debug)]
pub struct GlobalAlertController {
    kind: AlertKind,
    dispatcher: AlertDispatcher,
    session: ReconciliationSession,
    snapshot: Snapshot,
    overwrite: Overwrite,
}

impl GlobalAlertController {
    /// Opens a fresh session for `kind`.
    #[must_use]
    pub fn new(kind: AlertKind, dispatcher: AlertDispatcher, snapshot: Snapshot) -> Self {
        Self {
            kind,
            dispatcher,
            session: ReconciliationSession::new(),
            snapshot,
            overwrite: Overwrite::No,
        }
    }

    /// The alert kind this controller edits.
    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        self.kind
    }

    /// The form the panel starts with.
    #[must_use]
    pub fn form(&self) -> AlertForm {
        AlertForm::blank(self.kind)
    }

    /// Current state of the overwrite checkbox.
    #[must_use]
    pub const fn overwrite(&self) -> Overwrite {
        self.overwrite
    }

    /// Sets the overwrite checkbox. Takes effect on the next apply.
    pub fn set_overwrite(&mut self, overwrite: impl Into<Overwrite>) {
        self.overwrite = overwrite.into();
    }

    /// The session state.
    #[must_use]
    pub const fn session(&self) -> &ReconciliationSession {
        &self.session
    }

    /// The systems and alerts plans are computed against.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Replaces the snapshot, keeping the session.
    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
    }

    /// The dispatcher writes go through.
    #[must_use]
    pub const fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Applies the panel's current values to every system.
    ///
    /// Plans synchronously, submits the writes, and returns without waiting
    /// for them. Failures surface as notices.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidThreshold` for out-of-range values; the
    /// session is left untouched in that case.
    pub fn update_alert(&mut self, checked: bool, value: f64, min: u32) -> Result<Plan> {
        let threshold = AlertThreshold {
            enabled: checked,
            value,
            min,
        };
        self.apply(&threshold).map(|(plan, _)| plan)
    }

    /// Like [`update_alert`](Self::update_alert), also returning a handle
    /// per submitted write.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidThreshold` for out-of-range values.
    pub fn apply(
        &mut self,
        threshold: &AlertThreshold,
    ) -> Result<(Plan, Vec<TaskHandle<WriteOutcome>>)> {
        threshold.validate(self.kind)?;

        let plan = policy::plan(
            self.kind,
            threshold,
            &self.snapshot.systems,
            &self.snapshot.alerts,
            self.overwrite,
            &mut self.session,
        );

        let (create, update, delete) = plan.counts();
        info!(
            kind = %self.kind,
            enabled = threshold.enabled,
            create,
            update,
            delete,
            skipped = plan.skipped.len(),
            "applying alert to all systems"
        );

        let handles = self.dispatcher.dispatch(plan.actions.clone());
        Ok((plan, handles))
    }

    /// Waits until every submitted write has finished.
    pub async fn settle(&self) {
        self.dispatcher.queue().done().await;
    }
}

/// Editor for one alert kind on one system.
#[derive(Debug)]
pub struct SystemAlertController {
    system_id: String,
    kind: AlertKind,
    dispatcher: AlertDispatcher,
    existing: Option<AlertRecord>,
}

impl SystemAlertController {
    /// Opens the editor with the system's current alert, if any.
    #[must_use]
    pub fn new(
        dispatcher: AlertDispatcher,
        system_id: impl Into<String>,
        kind: AlertKind,
        existing: Option<AlertRecord>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            kind,
            dispatcher,
            existing,
        }
    }

    /// Opens the editor, looking the current alert up in `snapshot`.
    #[must_use]
    pub fn from_snapshot(
        dispatcher: AlertDispatcher,
        snapshot: &Snapshot,
        system_id: &str,
        kind: AlertKind,
    ) -> Self {
        let existing = snapshot.find(system_id, kind).cloned();
        Self::new(dispatcher, system_id, kind, existing)
    }

    /// The system this editor targets.
    #[must_use]
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// The alert kind this editor edits.
    #[must_use]
    pub const fn kind(&self) -> AlertKind {
        self.kind
    }

    /// The alert as last known.
    #[must_use]
    pub const fn existing(&self) -> Option<&AlertRecord> {
        self.existing.as_ref()
    }

    /// The form the editor starts with.
    #[must_use]
    pub fn form(&self) -> AlertForm {
        AlertForm::for_system(self.kind, self.existing.as_ref())
    }

    /// Writes the editor's values for this system.
    ///
    /// Returns `None` when nothing needed to change. A failed write yields
    /// `WriteOutcome::Failed` and a notice, not an error.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidThreshold` for out-of-range values.
    pub async fn update_alert(
        &mut self,
        checked: bool,
        value: f64,
        min: u32,
    ) -> Result<Option<WriteOutcome>> {
        let threshold = AlertThreshold {
            enabled: checked,
            value,
            min,
        };
        threshold.validate(self.kind)?;

        let Some(action) =
            policy::decide_single(&self.system_id, self.kind, &threshold, self.existing.as_ref())
        else {
            debug!(system_id = %self.system_id, kind = %self.kind, "alert already absent");
            return Ok(None);
        };

        let is_delete = matches!(action, AlertAction::Delete { .. });
        let outcome = self.dispatcher.execute(action).await;

        match &outcome {
            WriteOutcome::Applied(_) if is_delete => self.existing = None,
            WriteOutcome::Applied(Some(record)) => self.existing = Some(record.clone()),
            _ => {}
        }

        Ok(Some(outcome))
    }
}
