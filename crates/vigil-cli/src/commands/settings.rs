//! Settings command implementation.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use vigil_alerts::{LogNotifier, save_settings};
use vigil_store::RecordStore;

use crate::cli::SettingsCommands;
use crate::error::CliError;
use crate::output::{OutputFormat, Table, TableDisplay};

/// Handler for settings subcommands.
pub struct SettingsCommand {
    store: Arc<dyn RecordStore>,
}

impl SettingsCommand {
    /// Creates a settings handler backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Executes the settings subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the settings record is missing or the update fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &SettingsCommands,
    ) -> Result<(), CliError> {
        match command {
            SettingsCommands::Set { pairs } => {
                let changes: Map<String, Value> = pairs.iter().cloned().collect();
                let settings = save_settings(self.store.as_ref(), &LogNotifier, changes).await?;
                format.write(out, &SettingsView { settings })?;
                Ok(())
            }
        }
    }
}

/// The merged user settings.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    /// Settings after the update.
    pub settings: Map<String, Value>,
}

impl TableDisplay for SettingsView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ Settings saved")?;
        writeln!(writer)?;

        let mut table = Table::new(&["KEY", "VALUE"]);
        for (key, value) in &self.settings {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            table.row(vec![key.clone(), shown]);
        }
        table.write(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use serde_json::json;
    use vigil_store::{MemoryStore, records};

    #[tokio::test]
    async fn set_merges_and_prints() {
        let store = Arc::new(MemoryStore::with_user("u1"));
        store.seed(
            records::USER_SETTINGS,
            [json!({"id": "us1", "settings": {"chartTime": "1h", "emails": ["a@example.com"]}})],
        );
        let command = SettingsCommands::Set {
            pairs: vec![("chartTime".into(), json!("12h"))],
        };

        let mut out = Vec::new();
        SettingsCommand::new(store.clone())
            .execute(&mut out, &OutputFormat::new(Format::Table), &command)
            .await
            .expect("settings set should succeed");
        let output = String::from_utf8(out).expect("valid utf8");

        assert!(output.contains("✓ Settings saved"));
        assert!(output.contains("12h"));
        assert!(output.contains("[\"a@example.com\"]"));
        let stored = store.get(records::USER_SETTINGS, "us1").expect("record kept");
        assert_eq!(stored["settings"]["chartTime"], "12h");
    }

    #[tokio::test]
    async fn set_without_record_fails() {
        let store = Arc::new(MemoryStore::with_user("u1"));
        let command = SettingsCommands::Set {
            pairs: vec![("a".into(), json!(1))],
        };

        let mut out = Vec::new();
        let result = SettingsCommand::new(store)
            .execute(&mut out, &OutputFormat::default(), &command)
            .await;

        assert!(matches!(result, Err(CliError::Alert(_))));
    }
}
