//! # dog-pool: bounded-concurrency task pool
//!
//! Run an async handler over a batch of items with at most N invocations in
//! flight, then get every success and every failure back in one value.
//!
//! - **Bounded**: a new item is admitted only when fewer than `concurrency`
//!   tasks are active; admission waits for whichever task settles first.
//! - **Failure isolation**: one item failing never stops the others. Failures
//!   are collected as [`PoolError`]s (item + index + error) or routed to an
//!   error handler.
//! - **Completion order**: `results` and `errors` are ordered by when items
//!   settled, not by input position. [`PoolOutput::corresponding_results`]
//!   restores input order when needed.
//! - **Observable**: [`PoolMonitor`] exposes live counters and a broadcast
//!   stream of [`PoolEvent`]s; every run is wrapped in a `tracing` span.
//!
//! ## Quick start
//!
//! ```rust
//! use dog_pool::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> ExecutorResult<()> {
//! let output = TaskPool::new()
//!     .with_concurrency(3)
//!     .for_items(vec!["a.txt", "b.txt", "missing.txt"])
//!     .with_handler(|path: &'static str, _index| async move {
//!         if path.starts_with("missing") {
//!             Err(format!("{path} not found"))
//!         } else {
//!             Ok(path.len())
//!         }
//!     })
//!     .start()
//!     .await?;
//!
//! assert_eq!(output.results.len(), 2);
//! assert_eq!(output.errors.len(), 1);
//! assert_eq!(*output.errors[0].item(), "missing.txt");
//! # Ok(())
//! # }
//! ```
//!
//! Items are processed on the Tokio runtime via `tokio::spawn`, so items,
//! results and errors must be `Send + 'static`. Cancellation and timeouts are
//! left to the handler.

pub mod config;
pub mod error;
pub mod execution;
pub mod observability;
pub mod types;

pub use config::PoolConfig;
pub use error::{BoxError, ExecutorError, ExecutorResult, PoolError};
pub use execution::{ItemProcessor, TaskPool};
pub use observability::PoolMonitor;
pub use types::{PoolEvent, PoolOutput, RunId};

#[cfg(feature = "tracing-basic")]
pub use observability::{init_json_tracing, init_tracing};

/// Common imports for pool users
pub mod prelude {
    pub use crate::{
        ExecutorError, ExecutorResult, ItemProcessor, PoolConfig, PoolError, PoolEvent, PoolMonitor,
        PoolOutput, TaskPool,
    };

    pub use async_trait::async_trait;
}
