//! Request dispatch for planned alert writes.
//!
//! [`AlertDispatcher`] turns [`AlertAction`]s into store requests. Bulk
//! writes go through a bounded [`WorkQueue`]; single writes are issued
//! directly. Either way every request is keyed by its target system and a
//! newer request for a key supersedes the older one, whether the older one
//! is still queued or already talking to the backend.
//!
//! Failures never propagate to the caller. Each one produces exactly one
//! destructive [`Notice`] and leaves sibling requests alone.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vigil_queue::{TaskHandle, WorkQueue};
use vigil_store::{AlertRecord, RecordStore, StoreError, records};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::notify::{Notice, Notifier};
use crate::policy::AlertAction;

/// How a dispatched write ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The backend accepted the write. Carries the stored record for
    /// creates and updates.
    Applied(Option<AlertRecord>),
    /// The backend rejected the write; a notice was sent.
    Failed(String),
    /// A newer request for the same system replaced this one.
    Superseded,
}

impl WriteOutcome {
    /// Returns true if the write reached the backend successfully.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Returns true if the write failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Latest request per key.
#[derive(Debug, Default)]
struct RequestRegistry {
    next_generation: AtomicU64,
    latest: Mutex<HashMap<String, (u64, CancellationToken)>>,
}

impl RequestRegistry {
    /// Registers a new request for `key`, cancelling the previous one.
    fn begin(&self, key: &str) -> (u64, CancellationToken) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let previous = self
            .latest
            .lock()
            .insert(key.to_string(), (generation, token.clone()));
        if let Some((_, older)) = previous {
            older.cancel();
        }

        (generation, token)
    }

    /// Forgets `key` if `generation` is still its latest request.
    fn finish(&self, key: &str, generation: u64) {
        let mut latest = self.latest.lock();
        if latest.get(key).is_some_and(|(current, _)| *current == generation) {
            latest.remove(key);
        }
    }

    fn len(&self) -> usize {
        self.latest.lock().len()
    }
}

/// One keyed write, ready to run.
struct Request {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    requests: Arc<RequestRegistry>,
    action: AlertAction,
    generation: u64,
    token: CancellationToken,
}

impl Request {
    async fn run(self) -> WriteOutcome {
        let key = self.action.request_key().to_string();

        let result = tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            result = write(self.store.as_ref(), &self.action) => Some(result),
        };

        self.requests.finish(&key, self.generation);

        match result {
            None => {
                debug!(
                    system_id = %key,
                    action = self.action.verb(),
                    "alert request superseded"
                );
                WriteOutcome::Superseded
            }
            Some(Ok(record)) => {
                debug!(system_id = %key, action = self.action.verb(), "alert written");
                WriteOutcome::Applied(record)
            }
            Some(Err(e)) => {
                warn!(
                    system_id = %key,
                    action = self.action.verb(),
                    error = %e,
                    "alert write failed"
                );
                self.notifier.notify(Notice::alert_update_failed());
                WriteOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Issues one store request for `action`.
///
/// Creates need a signed-in user to own the new alert.
async fn write(store: &dyn RecordStore, action: &AlertAction) -> Result<Option<AlertRecord>> {
    let user = store.user_id();
    let stored = match action {
        AlertAction::Create { .. } => {
            let owner = user.ok_or(StoreError::Unauthenticated)?;
            let fields = action.fields(&owner).unwrap_or_default();
            store.create(records::ALERTS, fields).await?
        }
        AlertAction::Update { alert_id, .. } => {
            let fields = action.fields(user.as_deref().unwrap_or_default()).unwrap_or_default();
            store.update(records::ALERTS, alert_id, fields).await?
        }
        AlertAction::Delete { alert_id, .. } => {
            store.delete(records::ALERTS, alert_id).await?;
            return Ok(None);
        }
    };

    match records::decode(stored) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            debug!(error = %e, "stored alert has an unexpected shape");
            Ok(None)
        }
    }
}

/// Runs alert writes against a record store.
///
/// Cloning yields another handle sharing the same queue and request keys.
#[derive(Clone)]
pub struct AlertDispatcher {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    queue: WorkQueue,
    requests: Arc<RequestRegistry>,
}

impl fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("store", &self.store)
            .field("queue", &self.queue)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl AlertDispatcher {
    /// Creates a dispatcher that runs bulk writes on `queue`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>, queue: WorkQueue) -> Self {
        Self {
            store,
            notifier,
            queue,
            requests: Arc::new(RequestRegistry::default()),
        }
    }

    /// Creates a dispatcher with a queue sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Queue` if the configured concurrency is zero.
    pub fn from_config(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        config: &SyncConfig,
    ) -> Result<Self> {
        Ok(Self::new(store, notifier, config.build_queue()?))
    }

    /// Submits one queued task per action, in order.
    ///
    /// Must be called from within a Tokio runtime. The returned handles can
    /// be dropped; the writes still run.
    pub fn dispatch(&self, actions: Vec<AlertAction>) -> Vec<TaskHandle<WriteOutcome>> {
        actions
            .into_iter()
            .map(|action| {
                let request = self.prepare(action);
                self.queue.submit(request.run())
            })
            .collect()
    }

    /// Runs one write immediately, bypassing the queue.
    ///
    /// The write is still keyed, so it supersedes any queued or running
    /// request for the same system.
    pub async fn execute(&self, action: AlertAction) -> WriteOutcome {
        self.prepare(action).run().await
    }

    /// Number of systems with an outstanding request.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.requests.len()
    }

    /// The queue bulk writes run on.
    #[must_use]
    pub const fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// The notifier failures are reported to.
    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    fn prepare(&self, action: AlertAction) -> Request {
        let (generation, token) = self.requests.begin(action.request_key());
        Request {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            requests: Arc::clone(&self.requests),
            action,
            generation,
            token,
        }
    }
}
