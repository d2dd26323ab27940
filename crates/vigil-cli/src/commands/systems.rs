//! Systems command implementation.
//!
//! Handles listing and registering monitored systems.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use vigil_alerts::{NewSystem, register_system};
use vigil_store::{Filter, RecordStore, SystemRecord, records};

use crate::cli::{AddSystemArgs, SystemCommands};
use crate::error::CliError;
use crate::output::{Message, OutputFormat, Table, TableDisplay, truncate};

/// Handler for systems subcommands.
pub struct SystemsCommand {
    store: Arc<dyn RecordStore>,
}

impl SystemsCommand {
    /// Creates a systems handler backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Executes the systems subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &SystemCommands,
    ) -> Result<(), CliError> {
        match command {
            SystemCommands::List => self.list(out, format).await,
            SystemCommands::Add(args) => self.add(out, format, args).await,
        }
    }

    async fn list<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let raw = self.store.list(records::SYSTEMS, &Filter::all()).await?;
        let mut systems: Vec<SystemRecord> = records::decode_all(raw)?;
        systems.sort_by(|a, b| a.name.cmp(&b.name));

        format.write(out, &SystemList { systems })?;
        Ok(())
    }

    async fn add<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &AddSystemArgs,
    ) -> Result<(), CliError> {
        let system = NewSystem::new(&args.name, &args.host).with_port(&args.port);
        let record = register_system(self.store.as_ref(), &system).await?;

        format.write(
            out,
            &Message::success(format!("Registered system '{}' ({})", record.name, record.id)),
        )?;
        Ok(())
    }
}

/// List of systems.
#[derive(Debug, Clone, Serialize)]
pub struct SystemList {
    /// Systems, sorted by name.
    pub systems: Vec<SystemRecord>,
}

impl TableDisplay for SystemList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.systems.is_empty() {
            writeln!(writer, "No systems found")?;
            return Ok(());
        }

        let mut table = Table::new(&["NAME", "HOST", "PORT", "STATUS", "ID"]);
        for system in &self.systems {
            table.row(vec![
                truncate(&system.name, 32),
                system.host.clone(),
                system.port.clone(),
                status_label(&system.status),
                system.id.clone(),
            ]);
        }
        table.write(writer)?;

        let up = self.systems.iter().filter(|s| s.status == "up").count();
        writeln!(writer)?;
        writeln!(writer, "Total: {} system(s) ({} up)", self.systems.len(), up)?;
        Ok(())
    }
}

fn status_label(status: &str) -> String {
    match status {
        "up" => "● up".to_string(),
        "down" => "○ down".to_string(),
        "" => "-".to_string(),
        other => other.to_string(),
    }
}
