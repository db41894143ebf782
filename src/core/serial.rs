//! Strictly sequential queue.
//!
//! At most one item runs at a time. The next item is dequeued only after the
//! previous action settled and its handle was resolved or rejected, so items
//! run and settle in submission order. A slow item holds up everything behind
//! it.

use super::{AsyncTaskQueue, ConcurrencyPolicy};
use crate::config::QueueConfig;
use crate::error::AnvilResult;

/// Policy admitting one running item at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl ConcurrencyPolicy for Serial {
    fn can_process_more(&self, running: usize) -> bool {
        running == 0
    }

    fn capacity(&self) -> usize {
        1
    }

    fn label(&self) -> &'static str {
        "serial"
    }
}

/// Queue running one item at a time in submission order.
pub type SerialQueue = AsyncTaskQueue<Serial>;

impl AsyncTaskQueue<Serial> {
    /// Create a serial queue with the default configuration.
    pub fn new() -> Self {
        Self::from_parts(Serial, QueueConfig::default())
    }

    /// Create a serial queue with a custom configuration.
    ///
    /// `concurrent_limit` is ignored and not validated, a serial queue always
    /// has capacity 1.
    pub fn with_config(config: QueueConfig) -> AnvilResult<Self> {
        Self::with_policy(Serial, config)
    }
}

impl Default for AsyncTaskQueue<Serial> {
    fn default() -> Self {
        Self::new()
    }
}
