//! Alert threshold management for Vigil.
//!
//! `vigil-alerts` keeps per-system alert records in line with what the user
//! asked for, either for one system or for every system at once.
//!
//! # Features
//!
//! - **Reconciliation policy**: decides create, update, delete or skip per
//!   system, leaving customized alerts alone unless overwrite is requested
//! - **Sessions**: remember which systems were customized when a bulk panel
//!   was opened
//! - **Bounded dispatch**: bulk writes run through a FIFO queue with a fixed
//!   concurrency limit; newer writes for a system supersede older ones
//! - **Notices**: every failed write produces one user-facing notice
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use vigil_alerts::{
//!     AlertDispatcher, AlertKind, GlobalAlertController, NoticeLog, SyncConfig, load_snapshot,
//! };
//! use vigil_store::{MemoryStore, records};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), vigil_alerts::AlertError> {
//! let store = Arc::new(MemoryStore::with_user("u1"));
//! store.seed(records::SYSTEMS, [json!({"id": "s1", "name": "web"})]);
//!
//! let notices = Arc::new(NoticeLog::new());
//! let config = SyncConfig::default();
//! let dispatcher = AlertDispatcher::from_config(store.clone(), notices.clone(), &config)?;
//! let snapshot = load_snapshot(store.as_ref()).await?;
//!
//! let mut cpu = GlobalAlertController::new(AlertKind::Cpu, dispatcher, snapshot);
//! let plan = cpu.update_alert(true, 80.0, 10)?;
//! cpu.settle().await;
//!
//! assert_eq!(plan.actions.len(), 1);
//! assert_eq!(store.records(records::ALERTS).len(), 1);
//! assert!(notices.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod policy;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod systems;
pub mod types;

pub use config::SyncConfig;
pub use controller::{GlobalAlertController, SystemAlertController};
pub use dispatch::{AlertDispatcher, WriteOutcome};
pub use error::{AlertError, Result};
pub use notify::{LogNotifier, Notice, NoticeLog, NoticeSeverity, Notifier, Tee};
pub use policy::{AlertAction, Overwrite, Plan, SkipReason, decide_single, plan};
pub use session::{ReconciliationSession, SessionPhase};
pub use settings::save_settings;
pub use snapshot::{Snapshot, load_snapshot};
pub use systems::{DEFAULT_AGENT_PORT, NewSystem, register_system};
pub use types::{AlertForm, AlertKind, AlertThreshold};
