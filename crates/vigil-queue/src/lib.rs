//! Bounded FIFO work queue for Vigil.
//!
//! `vigil-queue` limits how many asynchronous tasks run at once. It is used
//! to spread bulk writes against the record store so the backend never sees
//! more than a handful of simultaneous requests.
//!
//! # Example
//!
//! ```rust
//! use vigil_queue::{WorkQueue, DEFAULT_CONCURRENCY};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = WorkQueue::new(DEFAULT_CONCURRENCY).unwrap();
//!
//! let handles: Vec<_> = (0..12)
//!     .map(|i| queue.submit(async move { i * 2 }))
//!     .collect();
//!
//! assert!(queue.active() <= DEFAULT_CONCURRENCY);
//!
//! for (i, handle) in handles.into_iter().enumerate() {
//!     assert_eq!(handle.await.unwrap(), i * 2);
//! }
//! queue.done().await;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod queue;

pub use error::{QueueError, Result};
pub use queue::{DEFAULT_CONCURRENCY, TaskHandle, WorkQueue};
