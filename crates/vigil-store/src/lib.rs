//! Record store client for the Vigil monitoring backend.
//!
//! The backend is a record service: named collections of JSON records with
//! create, update, delete and filtered list operations. This crate provides
//! the [`RecordStore`] seam plus two implementations:
//!
//! - [`HttpStore`]: REST client for a running backend
//! - [`MemoryStore`]: in-process collections for tests and embedding
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use vigil_store::{Filter, MemoryStore, RecordStore, records};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), vigil_store::StoreError> {
//! let store = MemoryStore::with_user("u1");
//! store
//!     .create(records::ALERTS, json!({"system": "s1", "name": "CPU", "value": 80, "min": 10}))
//!     .await?;
//!
//! let filter = Filter::all().equals("system", "s1");
//! let alerts: Vec<records::AlertRecord> =
//!     records::decode_all(store.list(records::ALERTS, &filter).await?)?;
//! assert_eq!(alerts[0].name, "CPU");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod memory;
pub mod records;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use http::{AuthSession, HttpStore, HttpStoreConfig};
pub use memory::{MemoryStore, StoreCall};
pub use records::{AlertRecord, SystemRecord, UserSettingsRecord};
pub use store::{Condition, Filter, RecordStore, StoreFuture};
