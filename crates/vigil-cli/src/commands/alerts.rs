//! Alerts command implementation.
//!
//! Handles listing alerts, setting one alert on one system, and applying
//! one alert to many systems.

use std::io::Write;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::info;
use vigil_alerts::{
    AlertDispatcher, AlertKind, AlertThreshold, GlobalAlertController, LogNotifier, NoticeLog,
    Notifier, Plan, Snapshot, SyncConfig, SystemAlertController, Tee, WriteOutcome, decide_single,
    load_snapshot,
};
use vigil_queue::QueueError;
use vigil_store::RecordStore;

use crate::cli::{AlertCommands, ApplyAlertArgs, SetAlertArgs};
use crate::error::CliError;
use crate::output::{OutputFormat, Table, TableDisplay};

/// Handler for alerts subcommands.
pub struct AlertsCommand {
    store: Arc<dyn RecordStore>,
    config: SyncConfig,
}

impl AlertsCommand {
    /// Creates an alerts handler backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Executes the alerts subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails or any alert write failed.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &AlertCommands,
    ) -> Result<(), CliError> {
        match command {
            AlertCommands::List { system } => self.list(out, format, system.as_deref()).await,
            AlertCommands::Set(args) => self.set(out, format, args).await,
            AlertCommands::Apply(args) => self.apply(out, format, args).await,
        }
    }

    fn dispatcher(&self, notices: Arc<NoticeLog>) -> Result<AlertDispatcher, CliError> {
        let notifier: Arc<dyn Notifier> = Arc::new(Tee::new(LogNotifier, notices));
        Ok(AlertDispatcher::from_config(
            Arc::clone(&self.store),
            notifier,
            &self.config,
        )?)
    }

    /// Loads a snapshot limited to `systems`, checking that each one exists.
    async fn snapshot(&self, systems: &[String]) -> Result<Snapshot, CliError> {
        let snapshot = load_snapshot(self.store.as_ref()).await?;
        if let Some(missing) = systems.iter().find(|id| snapshot.system(id).is_none()) {
            return Err(CliError::NotFound(format!("system {missing}")));
        }
        Ok(snapshot.restrict_to(systems))
    }

    async fn list<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        system: Option<&str>,
    ) -> Result<(), CliError> {
        let ids: Vec<String> = system.map(str::to_string).into_iter().collect();
        let snapshot = self.snapshot(&ids).await?;

        let mut alerts: Vec<AlertRow> = snapshot
            .systems
            .iter()
            .flat_map(|system| {
                snapshot.alerts_for(&system.id).filter_map(move |alert| {
                    let kind = alert.name.parse::<AlertKind>().ok()?;
                    Some(AlertRow {
                        id: alert.id.clone(),
                        system_id: system.id.clone(),
                        system_name: system.name.clone(),
                        kind,
                        value: alert.value,
                        min: alert.min,
                        triggered: alert.triggered,
                    })
                })
            })
            .collect();
        alerts.sort_by(|a, b| {
            a.system_name
                .cmp(&b.system_name)
                .then_with(|| kind_order(a.kind).cmp(&kind_order(b.kind)))
        });

        format.write(out, &AlertList { alerts })?;
        Ok(())
    }

    async fn set<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &SetAlertArgs,
    ) -> Result<(), CliError> {
        let kind = args.threshold.kind;
        let snapshot = self.snapshot(std::slice::from_ref(&args.system)).await?;

        let notices = Arc::new(NoticeLog::new());
        let dispatcher = self.dispatcher(notices)?;
        let mut editor =
            SystemAlertController::from_snapshot(dispatcher, &snapshot, &args.system, kind);
        let threshold = args.threshold.resolve(editor.form());
        threshold.validate(kind)?;

        let action = decide_single(&args.system, kind, &threshold, editor.existing())
            .map_or("none", |action| action.verb());
        let outcome = editor
            .update_alert(threshold.enabled, threshold.value, threshold.min)
            .await?;

        let change = AlertChange {
            system_id: args.system.clone(),
            kind,
            action: action.to_string(),
            result: match &outcome {
                None => "unchanged",
                Some(WriteOutcome::Applied(_)) => "applied",
                Some(WriteOutcome::Failed(_)) => "failed",
                Some(WriteOutcome::Superseded) => "superseded",
            }
            .to_string(),
            error: match outcome {
                Some(WriteOutcome::Failed(e)) => Some(e),
                _ => None,
            },
        };
        format.write(out, &change)?;

        if change.error.is_some() {
            return Err(CliError::Command("alert write failed".into()));
        }
        Ok(())
    }

    async fn apply<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ApplyAlertArgs,
    ) -> Result<(), CliError> {
        let kind = args.threshold.kind;
        let notices = Arc::new(NoticeLog::new());
        let snapshot = self.snapshot(&args.systems).await?;

        let mut controller =
            GlobalAlertController::new(kind, self.dispatcher(Arc::clone(&notices))?, snapshot);
        controller.set_overwrite(args.overwrite);
        let threshold = args.threshold.resolve(controller.form());

        let mut passes = Vec::with_capacity(args.passes as usize);
        for pass in 1..=args.passes {
            if pass > 1 {
                controller.set_snapshot(self.snapshot(&args.systems).await?);
            }
            let (plan, handles) = controller.apply(&threshold)?;
            let outcomes = join_all(handles).await;
            passes.push(PassReport::new(pass, &plan, &outcomes));
        }
        controller.settle().await;

        let report = ApplyReport {
            kind,
            threshold,
            overwrite: args.overwrite,
            passes,
            excluded: controller
                .session()
                .excluded()
                .into_iter()
                .map(str::to_string)
                .collect(),
            notices: notices.len(),
        };
        info!(
            kind = %kind,
            passes = report.passes.len(),
            failed = report.failed(),
            "alert apply finished"
        );
        format.write(out, &report)?;

        let failed = report.failed();
        if failed > 0 {
            return Err(CliError::Command(format!("{failed} alert write(s) failed")));
        }
        Ok(())
    }
}

fn kind_order(kind: AlertKind) -> usize {
    AlertKind::ALL.iter().position(|k| *k == kind).unwrap_or(usize::MAX)
}

fn threshold_label(kind: AlertKind, value: f64, min: u32) -> (String, String) {
    if kind.has_thresholds() {
        (format!("{value}{}", kind.unit()), format!("{min} min"))
    } else {
        ("-".to_string(), "-".to_string())
    }
}

// Output types

/// One alert in a listing.
#[derive(Debug, Clone, Serialize)]
pub struct AlertRow {
    /// Alert record id.
    pub id: String,
    /// System id.
    pub system_id: String,
    /// System display name.
    pub system_name: String,
    /// Alert kind.
    pub kind: AlertKind,
    /// Threshold value.
    pub value: f64,
    /// Sustained duration in minutes.
    pub min: u32,
    /// Whether the alert is currently triggered.
    pub triggered: bool,
}

/// List of alerts.
#[derive(Debug, Clone, Serialize)]
pub struct AlertList {
    /// Alerts, sorted by system name then kind.
    pub alerts: Vec<AlertRow>,
}

impl TableDisplay for AlertList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.alerts.is_empty() {
            writeln!(writer, "No alerts found")?;
            return Ok(());
        }

        let mut table = Table::new(&["SYSTEM", "KIND", "THRESHOLD", "DURATION", "TRIGGERED"]);
        for alert in &self.alerts {
            let (threshold, duration) = threshold_label(alert.kind, alert.value, alert.min);
            table.row(vec![
                alert.system_name.clone(),
                alert.kind.title().to_string(),
                threshold,
                duration,
                if alert.triggered { "yes" } else { "no" }.to_string(),
            ]);
        }
        table.write(writer)?;

        let triggered = self.alerts.iter().filter(|a| a.triggered).count();
        writeln!(writer)?;
        writeln!(
            writer,
            "Total: {} alert(s) ({} triggered)",
            self.alerts.len(),
            triggered
        )?;
        Ok(())
    }
}

/// Result of setting one alert.
#[derive(Debug, Clone, Serialize)]
pub struct AlertChange {
    /// Target system id.
    pub system_id: String,
    /// Alert kind.
    pub kind: AlertKind,
    /// Planned write: create, update, delete or none.
    pub action: String,
    /// How the write ended.
    pub result: String,
    /// Backend error, if the write failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableDisplay for AlertChange {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match (&self.error, self.action.as_str()) {
            (Some(e), _) => writeln!(
                writer,
                "✗ {} {} alert on {} failed: {e}",
                self.action, self.kind, self.system_id
            )?,
            (None, "none") => writeln!(
                writer,
                "{} alert on {} is already off",
                self.kind, self.system_id
            )?,
            (None, action) => writeln!(
                writer,
                "✓ {} alert on {}: {action} {}",
                self.kind, self.system_id, self.result
            )?,
        }
        Ok(())
    }
}

/// What happened in one apply pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    /// Pass number, from 1.
    pub pass: u32,
    /// Planned creates.
    pub created: usize,
    /// Planned updates.
    pub updated: usize,
    /// Planned deletes.
    pub deleted: usize,
    /// Systems left alone because they were customized.
    pub skipped: Vec<String>,
    /// Writes the backend accepted.
    pub applied: usize,
    /// Writes that failed.
    pub failed: usize,
    /// Writes replaced by a newer one.
    pub superseded: usize,
}

impl PassReport {
    fn new(pass: u32, plan: &Plan, outcomes: &[Result<WriteOutcome, QueueError>]) -> Self {
        let (created, updated, deleted) = plan.counts();
        let mut report = Self {
            pass,
            created,
            updated,
            deleted,
            skipped: plan.skipped.iter().map(|(id, _)| id.clone()).collect(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(WriteOutcome::Applied(_)) => report.applied += 1,
                Ok(WriteOutcome::Superseded) => report.superseded += 1,
                Ok(WriteOutcome::Failed(_)) | Err(_) => report.failed += 1,
            }
        }
        report
    }
}

/// Result of `alerts apply`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    /// Alert kind.
    pub kind: AlertKind,
    /// Applied threshold.
    pub threshold: AlertThreshold,
    /// Whether customized alerts were overwritten.
    pub overwrite: bool,
    /// One report per pass.
    pub passes: Vec<PassReport>,
    /// Systems the session treats as customized.
    pub excluded: Vec<String>,
    /// Notices raised during the run.
    pub notices: usize,
}

impl ApplyReport {
    /// Total failed writes across passes.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.passes.iter().map(|p| p.failed).sum()
    }
}

impl TableDisplay for ApplyReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.threshold.enabled {
            let (value, duration) =
                threshold_label(self.kind, self.threshold.value, self.threshold.min);
            if self.kind.has_thresholds() {
                writeln!(writer, "{}: {value} for {duration}", self.kind.title())?;
            } else {
                writeln!(writer, "{}: on", self.kind.title())?;
            }
        } else {
            writeln!(writer, "{}: off", self.kind.title())?;
        }
        writeln!(
            writer,
            "Overwrite existing alerts: {}",
            if self.overwrite { "yes" } else { "no" }
        )?;
        writeln!(writer)?;

        let mut table = Table::new(&[
            "PASS", "CREATE", "UPDATE", "DELETE", "SKIPPED", "APPLIED", "FAILED",
        ]);
        for pass in &self.passes {
            table.row(vec![
                pass.pass.to_string(),
                pass.created.to_string(),
                pass.updated.to_string(),
                pass.deleted.to_string(),
                pass.skipped.len().to_string(),
                pass.applied.to_string(),
                pass.failed.to_string(),
            ]);
        }
        table.write(writer)?;

        if !self.excluded.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Left unchanged (customized): {}", self.excluded.join(", "))?;
        }

        let failed = self.failed();
        if failed > 0 {
            writeln!(writer)?;
            writeln!(writer, "✗ {failed} write(s) failed; check logs for details")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Format, ThresholdArgs};
    use serde_json::json;
    use vigil_store::{MemoryStore, records};

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::with_user("u1"));
        store.seed(
            records::SYSTEMS,
            [("a", "alpha"), ("b", "bravo"), ("c", "charlie")].map(|(id, name)| {
                json!({"id": id, "name": name, "host": "10.0.0.1", "port": "45876", "status": "up"})
            }),
        );
        store.seed(
            records::ALERTS,
            [
                json!({"id": "xa", "system": "a", "name": "CPU", "value": 50, "min": 5, "triggered": true}),
                json!({"id": "xs", "system": "a", "name": "Status", "value": 0, "min": 0, "triggered": false}),
            ],
        );
        store
    }

    fn threshold(kind: AlertKind) -> ThresholdArgs {
        ThresholdArgs {
            kind,
            disable: false,
            value: None,
            min: None,
        }
    }

    fn apply_args(overwrite: bool, passes: u32) -> ApplyAlertArgs {
        ApplyAlertArgs {
            threshold: threshold(AlertKind::Cpu),
            overwrite,
            systems: Vec::new(),
            passes,
        }
    }

    async fn run(
        store: &Arc<MemoryStore>,
        format: Format,
        command: AlertCommands,
    ) -> (Result<(), CliError>, String) {
        let mut out = Vec::new();
        let result = AlertsCommand::new(store.clone(), SyncConfig::default())
            .execute(&mut out, &OutputFormat::new(format), &command)
            .await;
        (result, String::from_utf8(out).expect("valid utf8"))
    }

    fn cpu_value(store: &MemoryStore, system_id: &str) -> Option<serde_json::Value> {
        store
            .records(records::ALERTS)
            .into_iter()
            .find(|r| r["system"] == system_id && r["name"] == "CPU")
            .map(|r| r["value"].clone())
    }

    mod list_tests {
        use super::*;

        #[tokio::test]
        async fn list_shows_units_and_switches() {
            let store = seeded();
            let (result, output) =
                run(&store, Format::Table, AlertCommands::List { system: None }).await;

            result.expect("list should succeed");
            assert!(output.contains("alpha"));
            assert!(output.contains("CPU Usage"));
            assert!(output.contains("50%"));
            assert!(output.contains("5 min"));
            assert!(output.contains("Total: 2 alert(s) (1 triggered)"));
            // Status is listed before CPU.
            assert!(output.find("Status").unwrap() < output.find("CPU Usage").unwrap());
        }

        #[tokio::test]
        async fn list_groups_by_system_and_skips_orphans() {
            let store = seeded();
            store.seed(
                records::ALERTS,
                [
                    json!({"id": "xb", "system": "b", "name": "Disk", "value": 90, "min": 10}),
                    json!({"id": "xo", "system": "gone", "name": "CPU", "value": 80, "min": 10}),
                ],
            );

            let (result, output) =
                run(&store, Format::Json, AlertCommands::List { system: None }).await;

            result.expect("list should succeed");
            let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid json");
            let ids: Vec<&str> = parsed["alerts"]
                .as_array()
                .expect("alerts array")
                .iter()
                .filter_map(|row| row["id"].as_str())
                .collect();
            assert_eq!(ids, vec!["xs", "xa", "xb"]);
        }

        #[tokio::test]
        async fn list_for_one_system_hides_others() {
            let store = seeded();
            store.seed(
                records::ALERTS,
                [json!({"id": "xb", "system": "b", "name": "Disk", "value": 90, "min": 10})],
            );

            let (result, output) = run(
                &store,
                Format::Json,
                AlertCommands::List {
                    system: Some("b".into()),
                },
            )
            .await;

            result.expect("list should succeed");
            let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid json");
            assert_eq!(parsed["alerts"].as_array().map(Vec::len), Some(1));
            assert_eq!(parsed["alerts"][0]["system_name"], "bravo");
        }

        #[tokio::test]
        async fn list_for_unknown_system_fails() {
            let store = seeded();
            let (result, _) = run(
                &store,
                Format::Table,
                AlertCommands::List {
                    system: Some("zz".into()),
                },
            )
            .await;

            assert!(matches!(result, Err(CliError::NotFound(_))));
        }

        #[tokio::test]
        async fn list_for_system_without_alerts() {
            let store = seeded();
            let (result, output) = run(
                &store,
                Format::Table,
                AlertCommands::List {
                    system: Some("b".into()),
                },
            )
            .await;

            result.expect("list should succeed");
            assert!(output.contains("No alerts found"));
        }
    }

    mod set_tests {
        use super::*;

        #[tokio::test]
        async fn set_creates_with_defaults() {
            let store = seeded();
            let args = SetAlertArgs {
                system: "b".into(),
                threshold: threshold(AlertKind::Cpu),
            };

            let (result, output) = run(&store, Format::Table, AlertCommands::Set(args)).await;

            result.expect("set should succeed");
            assert!(output.contains("create applied"));
            assert_eq!(cpu_value(&store, "b"), Some(json!(80.0)));
        }

        #[tokio::test]
        async fn set_keeps_existing_values_not_given() {
            let store = seeded();
            let mut args = SetAlertArgs {
                system: "a".into(),
                threshold: threshold(AlertKind::Cpu),
            };
            args.threshold.min = Some(15);

            let (result, _) = run(&store, Format::Json, AlertCommands::Set(args)).await;

            result.expect("set should succeed");
            let stored = store.get(records::ALERTS, "xa").expect("alert kept");
            assert_eq!(stored["value"], 50.0);
            assert_eq!(stored["min"], 15);
            assert_eq!(stored["triggered"], false);
        }

        #[tokio::test]
        async fn set_disable_absent_alert_is_noop() {
            let store = seeded();
            let mut args = SetAlertArgs {
                system: "c".into(),
                threshold: threshold(AlertKind::Disk),
            };
            args.threshold.disable = true;

            let (result, output) = run(&store, Format::Table, AlertCommands::Set(args)).await;

            result.expect("set should succeed");
            assert!(output.contains("already off"));
            assert!(store.calls().is_empty());
        }

        #[tokio::test]
        async fn set_failure_is_reported() {
            let store = seeded();
            store.fail_writes_to(records::ALERTS);
            let args = SetAlertArgs {
                system: "b".into(),
                threshold: threshold(AlertKind::Cpu),
            };

            let (result, output) = run(&store, Format::Table, AlertCommands::Set(args)).await;

            assert!(matches!(result, Err(CliError::Command(_))));
            assert!(output.contains("✗ create CPU alert on b failed"));
        }

        #[tokio::test]
        async fn set_rejects_out_of_range_value() {
            let store = seeded();
            let mut args = SetAlertArgs {
                system: "b".into(),
                threshold: threshold(AlertKind::Cpu),
            };
            args.threshold.value = Some(120.0);

            let (result, _) = run(&store, Format::Table, AlertCommands::Set(args)).await;

            assert!(matches!(result, Err(CliError::Alert(_))));
            assert!(store.calls().is_empty());
        }
    }

    mod apply_tests {
        use super::*;

        #[tokio::test]
        async fn first_pass_skips_customized_system() {
            let store = seeded();

            let (result, output) =
                run(&store, Format::Table, AlertCommands::Apply(apply_args(false, 1))).await;

            result.expect("apply should succeed");
            assert_eq!(cpu_value(&store, "a"), Some(json!(50)));
            assert_eq!(cpu_value(&store, "b"), Some(json!(80.0)));
            assert_eq!(cpu_value(&store, "c"), Some(json!(80.0)));
            assert!(output.contains("CPU Usage: 80% for 10 min"));
            assert!(output.contains("Left unchanged (customized): a"));
        }

        #[tokio::test]
        async fn later_passes_update_eligible_systems() {
            let store = seeded();

            let (result, output) =
                run(&store, Format::Json, AlertCommands::Apply(apply_args(false, 2))).await;

            result.expect("apply should succeed");
            let report: serde_json::Value = serde_json::from_str(&output).expect("valid json");
            assert_eq!(report["passes"][0]["created"], 2);
            assert_eq!(report["passes"][0]["skipped"], json!(["a"]));
            assert_eq!(report["passes"][1]["created"], 0);
            assert_eq!(report["passes"][1]["updated"], 2);
            assert_eq!(report["passes"][1]["skipped"], json!(["a"]));
            assert_eq!(report["excluded"], json!(["a"]));
            assert_eq!(cpu_value(&store, "a"), Some(json!(50)));
        }

        #[tokio::test]
        async fn overwrite_updates_customized_system() {
            let store = seeded();

            let (result, output) =
                run(&store, Format::Json, AlertCommands::Apply(apply_args(true, 1))).await;

            result.expect("apply should succeed");
            let report: serde_json::Value = serde_json::from_str(&output).expect("valid json");
            assert_eq!(report["passes"][0]["updated"], 1);
            assert_eq!(report["passes"][0]["created"], 2);
            assert_eq!(report["excluded"], json!([]));
            assert_eq!(cpu_value(&store, "a"), Some(json!(80.0)));
        }

        #[tokio::test]
        async fn restricted_apply_only_touches_listed_systems() {
            let store = seeded();
            let mut args = apply_args(false, 1);
            args.systems = vec!["c".into()];

            let (result, _) = run(&store, Format::Table, AlertCommands::Apply(args)).await;

            result.expect("apply should succeed");
            assert_eq!(cpu_value(&store, "b"), None);
            assert_eq!(cpu_value(&store, "c"), Some(json!(80.0)));
        }

        #[tokio::test]
        async fn unknown_system_fails_before_writing() {
            let store = seeded();
            let mut args = apply_args(false, 1);
            args.systems = vec!["zz".into()];

            let (result, _) = run(&store, Format::Table, AlertCommands::Apply(args)).await;

            assert!(matches!(result, Err(CliError::NotFound(_))));
            assert!(store.calls().is_empty());
        }

        #[tokio::test]
        async fn failures_are_counted_and_returned() {
            let store = seeded();
            store.fail_writes_to(records::ALERTS);

            let (result, output) =
                run(&store, Format::Json, AlertCommands::Apply(apply_args(false, 1))).await;

            assert!(matches!(result, Err(CliError::Command(_))));
            let report: serde_json::Value = serde_json::from_str(&output).expect("valid json");
            assert_eq!(report["passes"][0]["failed"], 2);
            assert_eq!(report["notices"], 2);
        }

        #[tokio::test]
        async fn disable_with_overwrite_deletes() {
            let store = seeded();
            let mut args = apply_args(true, 1);
            args.threshold.disable = true;

            let (result, output) = run(&store, Format::Table, AlertCommands::Apply(args)).await;

            result.expect("apply should succeed");
            assert!(output.contains("CPU Usage: off"));
            assert_eq!(cpu_value(&store, "a"), None);
        }
    }
}
