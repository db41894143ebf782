//! # anvilq
//!
//! Sequence-preserving async task queues for Rust applications.
//!
//! ## Features
//!
//! - **Strict FIFO**: Items always start in the order they were submitted
//! - **Serial or bounded**: Run one item at a time, or up to N at once
//! - **Lifecycle control**: Pause, stop and resume without cancelling running work
//! - **Isolated results**: Every submitter sees exactly its own value or error
//! - **Observability**: Built-in tracing and queue statistics
//!
//! ## Quick Start
//!
//! ```rust
//! use anvilq::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> AnvilResult<()> {
//!     // Cap outbound lookups at two in flight
//!     let lookups = BoundedConcurrencyQueue::new(2)?;
//!
//!     let handles: Vec<_> = ["acme", "globex", "initech"]
//!         .into_iter()
//!         .map(|name| lookups.add_to_queue(move || async move { Ok(name.len()) }))
//!         .collect();
//!
//!     for handle in handles {
//!         println!("lookup finished: {}", handle.await?);
//!     }
//!
//!     // Writes to shared state, one at a time
//!     let writes = SerialQueue::new();
//!     writes.add_to_queue(|| async { Ok(()) }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! Started actions are never cancelled: `pause()` and `stop()` only keep new
//! items from starting.

pub mod config;
pub mod core;
pub mod error;
pub mod queue;
pub mod task;
pub mod utils;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::core::{
        AsyncTaskQueue, Bounded, BoundedConcurrencyQueue, ConcurrencyPolicy, Serial, SerialQueue,
    };
    pub use crate::error::{AnvilError, AnvilResult};
    pub use crate::queue::{IndexKeyedRing, QueueStats};
    pub use crate::task::{QueueItem, QueueTask, TaskHandle, TaskId, TaskOutcome};
    pub use async_trait::async_trait;
}

pub use crate::config::*;
pub use crate::core::{
    AsyncTaskQueue, Bounded, BoundedConcurrencyQueue, ConcurrencyPolicy, Serial, SerialQueue,
};
pub use crate::error::{AnvilError, AnvilResult};
pub use crate::queue::{IndexKeyedRing, QueueStats};
pub use crate::task::{QueueItem, QueueTask, TaskHandle, TaskId, TaskOutcome};
pub use crate::utils::init_logging;
pub use async_trait::async_trait;
