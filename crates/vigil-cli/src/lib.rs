//! # vigil-cli
//!
//! Vigil command-line interface.
//!
//! Provides commands for:
//! - Signing in to the backend
//! - Listing and registering systems
//! - Setting alert thresholds on one system or on many at once
//! - Updating user settings
//!
//! # Architecture
//!
//! Commands talk to the backend through [`vigil_store::HttpStore`]. Bulk
//! alert changes are planned by `vigil-alerts` and written through its
//! bounded queue.
//!
//! ```text
//! ┌───────────┐   plan    ┌──────────────┐  queue  ┌────────────┐  REST  ┌─────────┐
//! │ vigil-cli │──────────►│ vigil-alerts │────────►│ HttpStore  │───────►│ backend │
//! └───────────┘           └──────────────┘         └────────────┘        └─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use output::OutputFormat;
