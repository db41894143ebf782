//! Storage and bookkeeping for waiting work.
//!
//! Items wait in an [`IndexKeyedRing`] until the scheduler has capacity to run
//! them. The ring is purely synchronous: the scheduler owns it behind a lock and
//! never holds that lock across an `.await`.

pub mod ring;
pub use ring::IndexKeyedRing;

/// Statistics about the queue state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of items waiting in the ring
    pub pending: u64,
    /// Number of items currently executing
    pub running: u64,
    /// Total number of items ever submitted
    pub submitted: u64,
    /// Number of items whose action resolved
    pub completed: u64,
    /// Number of items whose action failed or panicked
    pub failed: u64,
    /// Highest number of simultaneously running items observed
    pub peak_running: u64,
    /// Whether the queue is paused
    pub is_paused: bool,
    /// Whether the queue is stopped
    pub is_stopped: bool,
}

impl QueueStats {
    /// Number of items that have settled, successfully or not.
    pub fn settled(&self) -> u64 {
        self.completed + self.failed
    }
}
