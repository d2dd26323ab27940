//! Command-line argument parsing with clap.

use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use vigil_alerts::{AlertForm, AlertKind, AlertThreshold, DEFAULT_AGENT_PORT};
use vigil_queue::DEFAULT_CONCURRENCY;
use vigil_store::HttpStoreConfig;
use vigil_store::http::DEFAULT_BASE_URL;

/// Vigil CLI - manage monitored systems and their alert thresholds.
#[derive(Parser, Debug, Clone)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Backend URL.
    #[arg(short, long, env = "VIGIL_URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Auth token, as printed by `vigil login`.
    #[arg(long, env = "VIGIL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Id of the user the token belongs to.
    #[arg(long, env = "VIGIL_USER")]
    pub user: Option<String>,

    /// Maximum number of alert writes in flight at once.
    #[arg(short, long, env = "VIGIL_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY,
          value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "VIGIL_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Store connection settings derived from the global flags.
    #[must_use]
    pub fn store_config(&self) -> HttpStoreConfig {
        HttpStoreConfig {
            base_url: self.url.clone(),
            token: self.token.clone(),
            user_id: self.user.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in and print an auth token.
    Login(LoginArgs),

    /// Monitored systems.
    Systems {
        /// Systems subcommand to execute.
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Alert thresholds.
    Alerts {
        /// Alerts subcommand to execute.
        #[command(subcommand)]
        command: AlertCommands,
    },

    /// User settings.
    Settings {
        /// Settings subcommand to execute.
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

/// Arguments for the login command.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Account email.
    #[arg(long, env = "VIGIL_EMAIL")]
    pub email: String,

    /// Account password.
    #[arg(long, env = "VIGIL_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Systems subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SystemCommands {
    /// List every visible system.
    List,

    /// Register a new system.
    Add(AddSystemArgs),
}

/// Arguments for registering a system.
#[derive(Args, Debug, Clone)]
pub struct AddSystemArgs {
    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Host name or IP address of the agent.
    #[arg(long)]
    pub host: String,

    /// Agent port.
    #[arg(long, default_value = DEFAULT_AGENT_PORT)]
    pub port: String,
}

/// Alerts subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AlertCommands {
    /// List alerts.
    List {
        /// Only show alerts on this system.
        #[arg(long)]
        system: Option<String>,
    },

    /// Set one alert on one system.
    Set(SetAlertArgs),

    /// Apply one alert to many systems.
    ///
    /// Systems that already have a customized alert of this kind are left
    /// alone unless `--overwrite` is given.
    Apply(ApplyAlertArgs),
}

/// The desired state of an alert.
#[derive(Args, Debug, Clone)]
pub struct ThresholdArgs {
    /// Alert kind: Status, CPU, Memory, Disk, Bandwidth or Temperature.
    #[arg(short, long)]
    pub kind: AlertKind,

    /// Remove the alert instead of setting it.
    #[arg(long, conflicts_with_all = ["value", "min"])]
    pub disable: bool,

    /// Threshold value.
    #[arg(long)]
    pub value: Option<f64>,

    /// Minutes the threshold must be exceeded.
    #[arg(long)]
    pub min: Option<u32>,
}

impl ThresholdArgs {
    /// Fills in unspecified values from `form`.
    #[must_use]
    pub fn resolve(&self, form: AlertForm) -> AlertThreshold {
        AlertThreshold {
            enabled: !self.disable,
            value: self.value.unwrap_or(form.value),
            min: self.min.unwrap_or(form.min),
        }
    }
}

/// Arguments for setting one alert.
#[derive(Args, Debug, Clone)]
pub struct SetAlertArgs {
    /// Target system id.
    #[arg(long)]
    pub system: String,

    /// Desired alert state.
    #[command(flatten)]
    pub threshold: ThresholdArgs,
}

/// Arguments for applying an alert to many systems.
#[derive(Args, Debug, Clone)]
pub struct ApplyAlertArgs {
    /// Desired alert state.
    #[command(flatten)]
    pub threshold: ThresholdArgs,

    /// Also overwrite alerts that were customized per system.
    #[arg(long)]
    pub overwrite: bool,

    /// Restrict to these system ids (repeatable). Defaults to every system.
    #[arg(long = "system", value_name = "ID")]
    pub systems: Vec<String>,

    /// Number of times to apply within one session.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub passes: u32,
}

/// Settings subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommands {
    /// Merge keys into the user settings.
    Set {
        /// Settings to change. Values are parsed as JSON, falling back to
        /// plain strings.
        #[arg(value_name = "KEY=VALUE", required = true, value_parser = parse_setting)]
        pairs: Vec<(String, Value)>,
    },
}

/// Parses a `KEY=VALUE` settings pair.
///
/// # Errors
///
/// Returns a message if there is no `=` or the key is empty.
pub fn parse_setting(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vigil").chain(args.iter().copied()))
            .expect("should parse")
    }

    #[test]
    fn global_defaults() {
        let cli = parse(&["systems", "list"]);
        assert_eq!(cli.url, "http://127.0.0.1:8090");
        assert_eq!(cli.concurrency, 5);
        assert_eq!(cli.timeout_secs, 30);
        assert_eq!(cli.format, Format::Table);
        assert!(!cli.log_json);
    }

    #[test]
    fn store_config_from_flags() {
        let cli = parse(&[
            "--url", "http://monitor:8090", "--token", "t", "--user", "u1", "--timeout-secs", "5",
            "systems", "list",
        ]);
        let config = cli.store_config();
        assert_eq!(config.base_url, "http://monitor:8090");
        assert_eq!(config.token.as_deref(), Some("t"));
        assert_eq!(config.user_id.as_deref(), Some("u1"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = Cli::try_parse_from(["vigil", "-c", "0", "systems", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_login() {
        let cli = parse(&["login", "--email", "a@example.com", "--password", "pw"]);
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.email, "a@example.com");
                assert_eq!(args.password, "pw");
            }
            _ => panic!("expected login command"),
        }
    }

    #[test]
    fn parse_systems_add_default_port() {
        let cli = parse(&["systems", "add", "--name", "web", "--host", "10.0.0.1"]);
        match cli.command {
            Commands::Systems {
                command: SystemCommands::Add(args),
            } => {
                assert_eq!(args.name, "web");
                assert_eq!(args.port, "45876");
            }
            _ => panic!("expected systems add command"),
        }
    }

    #[test]
    fn parse_alerts_set() {
        let cli = parse(&["alerts", "set", "--system", "s1", "--kind", "cpu", "--value", "90"]);
        match cli.command {
            Commands::Alerts {
                command: AlertCommands::Set(args),
            } => {
                assert_eq!(args.system, "s1");
                assert_eq!(args.threshold.kind, AlertKind::Cpu);
                assert_eq!(args.threshold.value, Some(90.0));
                assert_eq!(args.threshold.min, None);
                assert!(!args.threshold.disable);
            }
            _ => panic!("expected alerts set command"),
        }
    }

    #[test]
    fn parse_alerts_apply() {
        let cli = parse(&[
            "alerts", "apply", "--kind", "Disk", "--overwrite", "--system", "a", "--system", "b",
            "--passes", "2",
        ]);
        match cli.command {
            Commands::Alerts {
                command: AlertCommands::Apply(args),
            } => {
                assert_eq!(args.threshold.kind, AlertKind::Disk);
                assert!(args.overwrite);
                assert_eq!(args.systems, vec!["a", "b"]);
                assert_eq!(args.passes, 2);
            }
            _ => panic!("expected alerts apply command"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result = Cli::try_parse_from(["vigil", "alerts", "apply", "--kind", "gpu"]);
        assert!(result.is_err());
    }

    #[test]
    fn disable_conflicts_with_value() {
        let result = Cli::try_parse_from([
            "vigil", "alerts", "apply", "--kind", "cpu", "--disable", "--value", "50",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_passes_is_rejected() {
        let result =
            Cli::try_parse_from(["vigil", "alerts", "apply", "--kind", "cpu", "--passes", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn threshold_resolution_fills_gaps_from_form() {
        let cli = parse(&["alerts", "apply", "--kind", "cpu", "--min", "3"]);
        let Commands::Alerts {
            command: AlertCommands::Apply(args),
        } = cli.command
        else {
            panic!("expected alerts apply command");
        };

        let threshold = args.threshold.resolve(AlertForm::blank(AlertKind::Cpu));
        assert_eq!(threshold, AlertThreshold::enabled(80.0, 3));
    }

    #[test]
    fn parse_settings_pairs() {
        let cli = parse(&["settings", "set", "chartTime=12h", "emails=[\"a@example.com\"]"]);
        match cli.command {
            Commands::Settings {
                command: SettingsCommands::Set { pairs },
            } => {
                assert_eq!(pairs[0], ("chartTime".to_string(), json!("12h")));
                assert_eq!(pairs[1], ("emails".to_string(), json!(["a@example.com"])));
            }
            _ => panic!("expected settings set command"),
        }
    }

    #[test]
    fn parse_setting_values() {
        assert_eq!(parse_setting("n=5").unwrap(), ("n".to_string(), json!(5)));
        assert_eq!(parse_setting("b=true").unwrap(), ("b".to_string(), json!(true)));
        assert_eq!(parse_setting("s=a=b").unwrap(), ("s".to_string(), json!("a=b")));
        assert!(parse_setting("novalue").is_err());
        assert!(parse_setting("=5").is_err());
    }

    #[test]
    fn json_format_flag() {
        let cli = parse(&["--format", "json", "alerts", "list", "--system", "s1"]);
        assert_eq!(cli.format, Format::Json);
    }
}
