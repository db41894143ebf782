//! Concurrency policies deciding when a queue may start another item.

/// Decides whether a queue has capacity to start another item.
///
/// The scheduler owns the FIFO ordering and the lifecycle flags; a policy only
/// answers the capacity question given the number of items already running.
pub trait ConcurrencyPolicy: Send + Sync + 'static {
    /// Whether another item may start while `running` items are in flight.
    fn can_process_more(&self, running: usize) -> bool;

    /// Maximum number of simultaneously running items.
    fn capacity(&self) -> usize;

    /// Short name used in log fields.
    fn label(&self) -> &'static str;
}
