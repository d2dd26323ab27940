//! Vigil CLI binary entrypoint.
//!
//! This is the main entry point for the `vigil` command-line tool.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_alerts::SyncConfig;
use vigil_cli::cli::{Cli, Commands};
use vigil_cli::commands::{AlertsCommand, LoginCommand, SettingsCommand, SystemsCommand};
use vigil_cli::output::OutputFormat;
use vigil_store::{HttpStore, RecordStore};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), vigil_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    if let Commands::Login(args) = &cli.command {
        let cmd = LoginCommand::new(cli.store_config());
        return cmd.execute(&mut stdout, &format, args).await;
    }

    let store: Arc<dyn RecordStore> = Arc::new(HttpStore::new(cli.store_config())?);

    match &cli.command {
        Commands::Login(_) => {}
        Commands::Systems { command } => {
            let cmd = SystemsCommand::new(store);
            cmd.execute(&mut stdout, &format, command).await?;
        }
        Commands::Alerts { command } => {
            let config = SyncConfig::default().with_concurrency(cli.concurrency);
            let cmd = AlertsCommand::new(store, config);
            cmd.execute(&mut stdout, &format, command).await?;
        }
        Commands::Settings { command } => {
            let cmd = SettingsCommand::new(store);
            cmd.execute(&mut stdout, &format, command).await?;
        }
    }

    Ok(())
}
