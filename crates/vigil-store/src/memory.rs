//! In-process record store.
//!
//! [`MemoryStore`] keeps collections in memory. It is the store double for
//! tests and embedders: writes can be slowed down or made to fail per
//! collection, and every write is recorded in a call log.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::store::{Filter, RecordStore, StoreFuture};

/// Length of generated record ids.
const ID_LEN: usize = 15;

/// A write that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// A record was created.
    Create {
        /// Target collection.
        collection: String,
        /// Id of the new record.
        id: String,
    },
    /// A record was updated.
    Update {
        /// Target collection.
        collection: String,
        /// Updated record id.
        id: String,
    },
    /// A record was deleted.
    Delete {
        /// Target collection.
        collection: String,
        /// Deleted record id.
        id: String,
    },
}

impl StoreCall {
    /// Returns the collection this call targeted.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Create { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing: HashSet<String>,
    latency: Option<Duration>,
}

/// In-memory implementation of [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    user_id: Option<String>,
    faults: Mutex<Faults>,
    calls: Mutex<Vec<StoreCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter even when the request future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    /// Creates an empty store with no authenticated user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store acting on behalf of `user_id`.
    #[must_use]
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Inserts records directly, bypassing the call log.
    ///
    /// Records without an `id` get a generated one.
    pub fn seed(&self, collection: &str, records: impl IntoIterator<Item = Value>) {
        let mut collections = self.collections.write();
        let entries = collections.entry(collection.to_string()).or_default();
        for mut record in records {
            if let Value::Object(fields) = &mut record {
                fields
                    .entry("id".to_string())
                    .or_insert_with(|| Value::String(generate_id()));
            }
            entries.push(record);
        }
    }

    /// Makes every write to `collection` fail with `StoreError::Rejected`.
    pub fn fail_writes_to(&self, collection: &str) {
        self.faults.lock().failing.insert(collection.to_string());
    }

    /// Removes all injected write failures.
    pub fn heal(&self) {
        self.faults.lock().failing.clear();
    }

    /// Delays every write by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.lock().latency = Some(latency);
    }

    /// Returns every write that completed, in completion order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Returns the highest number of writes that were in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of a collection.
    #[must_use]
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns one record by id.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .read()
            .get(collection)?
            .iter()
            .find(|record| record_id(record) == Some(id))
            .cloned()
    }

    /// Waits out the configured latency and checks injected failures.
    async fn begin_write(&self, collection: &str) -> StoreResult<InFlight<'_>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let latency = self.faults.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.faults.lock().failing.contains(collection) {
            debug!(collection, "rejecting write");
            return Err(StoreError::Rejected {
                reason: format!("writes to '{collection}' are failing"),
            });
        }

        Ok(guard)
    }

    fn record(&self, call: StoreCall) {
        trace!(?call, "store write");
        self.calls.lock().push(call);
    }
}

impl RecordStore for MemoryStore {
    fn create<'a>(&'a self, collection: &'a str, fields: Value) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let Value::Object(mut fields) = fields else {
                return Err(StoreError::InvalidRecord {
                    reason: "record must be a JSON object".to_string(),
                });
            };

            let _guard = self.begin_write(collection).await?;

            let id = match fields.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => generate_id(),
            };
            let now = Utc::now().to_rfc3339();
            fields.insert("id".to_string(), Value::String(id.clone()));
            fields.insert("created".to_string(), Value::String(now.clone()));
            fields.insert("updated".to_string(), Value::String(now));
            let record = Value::Object(fields);

            {
                let mut collections = self.collections.write();
                let entries = collections.entry(collection.to_string()).or_default();
                if entries.iter().any(|r| record_id(r) == Some(id.as_str())) {
                    return Err(StoreError::Rejected {
                        reason: format!("record '{id}' already exists"),
                    });
                }
                entries.push(record.clone());
            }

            self.record(StoreCall::Create {
                collection: collection.to_string(),
                id,
            });
            Ok(record)
        })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Value,
    ) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            let Value::Object(fields) = fields else {
                return Err(StoreError::InvalidRecord {
                    reason: "update must be a JSON object".to_string(),
                });
            };

            let _guard = self.begin_write(collection).await?;

            let updated = {
                let mut collections = self.collections.write();
                let record = collections
                    .get_mut(collection)
                    .and_then(|entries| entries.iter_mut().find(|r| record_id(r) == Some(id)))
                    .ok_or_else(|| not_found(collection, id))?;

                if let Value::Object(existing) = record {
                    merge(existing, fields);
                    existing.insert(
                        "updated".to_string(),
                        Value::String(Utc::now().to_rfc3339()),
                    );
                }
                record.clone()
            };

            self.record(StoreCall::Update {
                collection: collection.to_string(),
                id: id.to_string(),
            });
            Ok(updated)
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let _guard = self.begin_write(collection).await?;

            {
                let mut collections = self.collections.write();
                let entries = collections
                    .get_mut(collection)
                    .ok_or_else(|| not_found(collection, id))?;
                let before = entries.len();
                entries.retain(|r| record_id(r) != Some(id));
                if entries.len() == before {
                    return Err(not_found(collection, id));
                }
            }

            self.record(StoreCall::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            });
            Ok(())
        })
    }

    fn list<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> StoreFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let collections = self.collections.read();
            Ok(collections
                .get(collection)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|record| filter.matches(record))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

fn merge(existing: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        if key != "id" {
            existing.insert(key, value);
        }
    }
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}
