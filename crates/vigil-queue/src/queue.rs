//! The bounded work queue.
//!
//! [`WorkQueue`] runs submitted futures on the Tokio runtime with at most
//! `capacity` of them in flight. Each running slot is a runner task that
//! drains the pending FIFO, so tasks start in exactly the order they were
//! submitted. Completion order is not ordered.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, trace};

use crate::error::{QueueError, Result};

/// Concurrency limit used when no explicit capacity is configured.
pub const DEFAULT_CONCURRENCY: usize = 5;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueueState {
    /// Number of runner tasks currently executing a job.
    running: usize,
    /// Jobs waiting for a free slot, oldest first.
    pending: VecDeque<Job>,
}

struct Shared {
    capacity: usize,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl Shared {
    fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.running == 0 && state.pending.is_empty()
    }
}

/// A FIFO task queue with a fixed concurrency limit.
///
/// Cloning a `WorkQueue` yields another handle to the same queue. Tasks
/// that were already submitted keep running after every handle is dropped.
///
/// `submit` must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("capacity", &self.capacity())
            .field("active", &self.active())
            .field("pending", &self.size())
            .finish()
    }
}

impl WorkQueue {
    /// Creates a queue that runs at most `capacity` tasks at once.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::ZeroCapacity` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                capacity,
                state: Mutex::new(QueueState {
                    running: 0,
                    pending: VecDeque::new(),
                }),
                idle: Notify::new(),
            }),
        })
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns the number of tasks currently executing.
    #[must_use]
    pub fn active(&self) -> usize {
        self.shared.state.lock().running
    }

    /// Returns the number of tasks waiting for a free slot.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Returns true if nothing is running or waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.shared.is_idle()
    }

    /// Submits a task and returns a handle resolving to its output.
    ///
    /// The task starts immediately if a slot is free, otherwise after every
    /// task submitted before it has started. Dropping the handle does not
    /// cancel the task.
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|_| QueueError::Panicked);
            if outcome.is_err() {
                debug!("queued task panicked");
            }
            // The caller may have dropped its handle.
            let _ = tx.send(outcome);
        });

        let mut state = self.shared.state.lock();
        if state.running < self.shared.capacity {
            state.running += 1;
            trace!(active = state.running, "starting task");
            drop(state);
            spawn_runner(Arc::clone(&self.shared), job);
        } else {
            state.pending.push_back(job);
            trace!(pending = state.pending.len(), "queued task");
        }

        TaskHandle { rx }
    }

    /// Drops every task that has not started yet.
    ///
    /// Handles of the dropped tasks resolve to `QueueError::Cancelled`.
    /// Returns the number of tasks removed.
    pub fn clear(&self) -> usize {
        let (removed, idle) = {
            let mut state = self.shared.state.lock();
            let removed: Vec<Job> = state.pending.drain(..).collect();
            (removed, state.running == 0)
        };

        let count = removed.len();
        drop(removed);

        if count > 0 {
            debug!(count, "cleared pending tasks");
        }
        if idle {
            self.shared.idle.notify_waiters();
        }

        count
    }

    /// Waits until no task is running or pending.
    pub async fn done(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.is_idle() {
                return;
            }

            notified.await;
        }
    }
}

fn spawn_runner(shared: Arc<Shared>, first: Job) {
    tokio::spawn(async move {
        let mut job = first;
        loop {
            job.await;

            let next = {
                let mut state = shared.state.lock();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.running -= 1;
                }
                next
            };

            match next {
                Some(n) => job = n,
                None => break,
            }
        }

        if shared.is_idle() {
            shared.idle.notify_waiters();
        }
    });
}

/// Handle to a submitted task's outcome.
///
/// Resolves to the task's output, or to a [`QueueError`] if the task was
/// cleared before starting or panicked.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(QueueError::Cancelled)))
    }
}
