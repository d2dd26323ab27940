//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`login`] - Sign in and print a token
//! - [`systems`] - Monitored systems
//! - [`alerts`] - Alert thresholds
//! - [`settings`] - User settings

pub mod alerts;
pub mod login;
pub mod settings;
pub mod systems;

pub use alerts::AlertsCommand;
pub use login::LoginCommand;
pub use settings::SettingsCommand;
pub use systems::SystemsCommand;
