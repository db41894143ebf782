//! The scheduler shared by every anvilq queue.
//!
//! [`AsyncTaskQueue`] keeps waiting items in an [`IndexKeyedRing`], owns the
//! pause/stop lifecycle and runs items on the tokio runtime. How many items may
//! run at once is decided by its [`ConcurrencyPolicy`]:
//!
//! - [`SerialQueue`]: one item at a time, settling in submission order
//! - [`BoundedConcurrencyQueue`]: up to N items at once, started in submission
//!   order but settling in whatever order their actions finish
//!
//! Bookkeeping happens in short critical sections that never span an `.await`.
//! The only suspension point per item is its own action.

use crate::config::QueueConfig;
use crate::error::{AnvilError, AnvilResult};
use crate::queue::{IndexKeyedRing, QueueStats};
use crate::task::{QueueItem, QueueTask, TaskHandle, TaskId, TaskOutcome};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use uuid::Uuid;

pub mod bounded;
pub mod policy;
pub mod serial;

pub use bounded::{Bounded, BoundedConcurrencyQueue};
pub use policy::ConcurrencyPolicy;
pub use serial::{Serial, SerialQueue};

/// Mutable scheduler state, guarded by a single lock.
#[derive(Debug, Default)]
struct SchedulerState {
    ring: IndexKeyedRing<QueueItem>,
    running: usize,
    is_paused: bool,
    is_stopped: bool,
    submitted: u64,
    completed: u64,
    failed: u64,
    peak_running: usize,
}

impl SchedulerState {
    fn is_gated(&self) -> bool {
        self.is_paused || self.is_stopped
    }
}

struct Shared<P> {
    id: Uuid,
    config: QueueConfig,
    policy: P,
    state: Mutex<SchedulerState>,
    idle: Notify,
}

impl<P> Shared<P> {
    // Nothing in a critical section can panic on correct usage, so a poisoned
    // lock still holds consistent state.
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sequence-preserving async task queue.
///
/// Callers submit actions with [`add_to_queue`](Self::add_to_queue) and await
/// the returned [`TaskHandle`]. Items always leave the queue in submission
/// order. Cloning the queue is cheap and every clone drives the same state.
///
/// # Examples
///
/// ```rust
/// use anvilq::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> AnvilResult<()> {
///     let queue = SerialQueue::new();
///
///     let first = queue.add_to_queue(|| async { Ok(1) });
///     let second = queue.add_to_queue(|| async { Ok(2) });
///
///     assert_eq!(first.await?, 1);
///     assert_eq!(second.await?, 2);
///     Ok(())
/// }
/// ```
pub struct AsyncTaskQueue<P: ConcurrencyPolicy> {
    shared: Arc<Shared<P>>,
}

impl<P: ConcurrencyPolicy> Clone for AsyncTaskQueue<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: ConcurrencyPolicy> AsyncTaskQueue<P> {
    /// Create a queue driven by `policy`.
    ///
    /// Capacity comes from the policy; `config.concurrent_limit` is not
    /// consulted here.
    pub fn with_policy(policy: P, config: QueueConfig) -> AnvilResult<Self> {
        config.validate_shared()?;
        Ok(Self::from_parts(policy, config))
    }

    fn from_parts(policy: P, config: QueueConfig) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(
            "🔨 Created {} queue '{}' ({}) with capacity {}",
            policy.label(),
            config.name,
            id,
            policy.capacity()
        );

        Self {
            shared: Arc::new(Shared {
                id,
                config,
                policy,
                state: Mutex::new(SchedulerState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Submit an action and return a handle settling with its result.
    ///
    /// Processing starts right away unless the queue was configured with
    /// `auto_dequeue = false`.
    pub fn add_to_queue<F, Fut, T>(&self, action: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AnvilResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.add_to_queue_with(action, self.shared.config.auto_dequeue)
    }

    /// Submit an action, choosing whether to start processing immediately.
    ///
    /// With `auto_dequeue = false` the item waits until something else
    /// triggers processing: [`start`](Self::start), a later auto-dequeued
    /// submission, or a running item finishing. If none of those happen the
    /// item stays queued indefinitely.
    pub fn add_to_queue_with<F, Fut, T>(&self, action: F, auto_dequeue: bool) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AnvilResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.push(None, action, auto_dequeue)
    }

    /// Submit a typed task.
    pub fn submit<Q: QueueTask>(&self, task: Q) -> TaskHandle<Q::Output> {
        let name = task.name();
        self.push(Some(name), move || task.run(), self.shared.config.auto_dequeue)
    }

    fn push<F, Fut, T>(
        &self,
        name: Option<&'static str>,
        action: F,
        auto_dequeue: bool,
    ) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AnvilResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = {
            let mut state = self.shared.lock_state();
            let (item, handle) = QueueItem::new(state.ring.next_key(), action);
            let item = match name {
                Some(name) => item.named(name),
                None => item,
            };
            state.ring.enqueue(item);
            state.submitted += 1;
            handle
        };

        tracing::debug!(
            "🔨 [{}] Enqueued task {}{}",
            self.shared.config.name,
            handle.id(),
            name.map(|n| format!(" ({})", n)).unwrap_or_default()
        );

        if auto_dequeue {
            self.start_processing();
        }
        handle
    }

    /// Prevent any further items from starting.
    ///
    /// Items already running are not interrupted.
    pub fn stop(&self) {
        let mut state = self.shared.lock_state();
        if !state.is_stopped {
            state.is_stopped = true;
            tracing::info!("🔨 [{}] Queue stopped", self.shared.config.name);
        }
    }

    /// Pause the queue until [`start`](Self::start) is called.
    ///
    /// Items already running are not interrupted.
    pub fn pause(&self) {
        let mut state = self.shared.lock_state();
        if !state.is_paused {
            state.is_paused = true;
            tracing::info!("🔨 [{}] Queue paused", self.shared.config.name);
        }
    }

    /// Clear the pause and stop flags and try to start waiting items.
    ///
    /// Returns whether at least one item was started.
    pub fn start(&self) -> bool {
        {
            let mut state = self.shared.lock_state();
            if state.is_gated() {
                tracing::info!("🔨 [{}] Queue resumed", self.shared.config.name);
            }
            state.is_paused = false;
            state.is_stopped = false;
        }
        self.start_processing()
    }

    /// Start as many waiting items as the policy allows.
    fn start_processing(&self) -> bool {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                if !self.is_empty() {
                    tracing::warn!(
                        "🔨 [{}] No tokio runtime available, {} task(s) left waiting",
                        self.shared.config.name,
                        self.size()
                    );
                }
                return false;
            }
        };

        let batch = {
            let mut state = self.shared.lock_state();
            self.take_startable(&mut state)
        };
        let started = !batch.is_empty();
        self.dispatch(&runtime, batch);
        started
    }

    /// Dequeue every item the policy currently admits, reserving capacity
    /// for each one.
    fn take_startable(&self, state: &mut SchedulerState) -> Vec<QueueItem> {
        let mut batch = Vec::new();
        while !state.is_gated() && self.shared.policy.can_process_more(state.running) {
            let Some(item) = state.ring.dequeue() else {
                break;
            };
            state.running += 1;
            state.peak_running = state.peak_running.max(state.running);
            batch.push(item);
        }
        batch
    }

    fn dispatch(&self, runtime: &Handle, batch: Vec<QueueItem>) {
        for item in batch {
            tracing::debug!(
                "🔨 [{}] Starting task {} after waiting {:?}",
                self.shared.config.name,
                item.id(),
                item.waited()
            );
            // The slot is created before spawning so that a future dropped
            // without ever being polled still gives its capacity back.
            let slot = RunningSlot::new(self.clone(), item.id());
            runtime.spawn(Self::process_item(slot, runtime.clone(), item));
        }
    }

    async fn process_item(slot: RunningSlot<P>, runtime: Handle, item: QueueItem) {
        let outcome = item.execute().await;
        let name = &slot.queue.shared.config.name;

        match outcome {
            TaskOutcome::Resolved => {
                tracing::debug!("🔨 [{}] Task {} resolved", name, slot.task_id);
            }
            TaskOutcome::Rejected => {
                tracing::warn!("🔨 [{}] Task {} rejected", name, slot.task_id);
            }
            TaskOutcome::Panicked => {
                tracing::error!("🔨 [{}] Task {} panicked", name, slot.task_id);
            }
        }

        slot.settle(&runtime, outcome);
    }

    /// Give back one unit of capacity and record how the item ended.
    ///
    /// With `refill` the freed capacity is handed to waiting items under the
    /// same lock, so observers never see an empty slot while items are still
    /// waiting. The returned batch must be dispatched by the caller.
    fn release(&self, succeeded: bool, refill: bool) -> Vec<QueueItem> {
        let (batch, now_idle) = {
            let mut state = self.shared.lock_state();
            state.running = state.running.saturating_sub(1);
            if succeeded {
                state.completed += 1;
            } else {
                state.failed += 1;
            }
            let batch = if refill {
                self.take_startable(&mut state)
            } else {
                Vec::new()
            };
            (batch, state.running == 0)
        };

        if now_idle {
            self.shared.idle.notify_waiters();
        }
        batch
    }

    /// Wait until no item is running.
    ///
    /// Items left waiting because the queue is paused or stopped do not keep
    /// the queue busy.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.lock_state().running == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop the queue and wait for running items to finish.
    ///
    /// Running actions are never cancelled; if they are still busy after
    /// `grace` this returns [`AnvilError::Timeout`] and they keep running.
    pub async fn shutdown(&self, grace: Duration) -> AnvilResult<()> {
        self.stop();
        tracing::info!(
            "🔨 [{}] Shutting down, {} task(s) running, {} waiting",
            self.shared.config.name,
            self.running_tasks(),
            self.size()
        );

        match tokio::time::timeout(grace, self.wait_idle()).await {
            Ok(()) => {
                tracing::info!("🔨 [{}] Queue shut down cleanly", self.shared.config.name);
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    "🔨 [{}] Shutdown timed out after {:?}",
                    self.shared.config.name,
                    grace
                );
                Err(AnvilError::Timeout {
                    timeout_ms: grace.as_millis() as u64,
                })
            }
        }
    }

    /// Shut down using the configured grace period.
    pub async fn shutdown_default(&self) -> AnvilResult<()> {
        self.shutdown(self.shared.config.shutdown_timeout()).await
    }

    /// Drop every waiting item, failing their handles with
    /// [`AnvilError::Abandoned`]. Running items are unaffected.
    ///
    /// Returns the number of items dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut state = self.shared.lock_state();
            state.ring.drain()
        };
        let count = dropped.len();
        drop(dropped);

        if count > 0 {
            tracing::warn!(
                "🔨 [{}] Cleared {} waiting task(s)",
                self.shared.config.name,
                count
            );
        }
        count
    }

    /// Number of items waiting to start.
    pub fn size(&self) -> usize {
        self.shared.lock_state().ring.len()
    }

    /// Whether no items are waiting to start.
    pub fn is_empty(&self) -> bool {
        self.shared.lock_state().ring.is_empty()
    }

    /// Whether at least one item is running.
    ///
    /// An item keeps its capacity until just after its handle settles, so on a
    /// multi-threaded runtime a submitter that has just received its result may
    /// still briefly see its own item counted here. Use
    /// [`wait_idle`](Self::wait_idle) to wait for the release.
    pub fn is_running(&self) -> bool {
        self.shared.lock_state().running > 0
    }

    /// Number of items currently running.
    ///
    /// Like [`is_running`](Self::is_running), this may lag a just-settled
    /// handle by one release.
    pub fn running_tasks(&self) -> usize {
        self.shared.lock_state().running
    }

    /// Whether the queue is paused.
    pub fn is_paused(&self) -> bool {
        self.shared.lock_state().is_paused
    }

    /// Whether the queue is stopped.
    pub fn is_stopped(&self) -> bool {
        self.shared.lock_state().is_stopped
    }

    /// Maximum number of simultaneously running items.
    pub fn capacity(&self) -> usize {
        self.shared.policy.capacity()
    }

    /// Unique id of this queue instance.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Name given in the configuration.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Configuration the queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Snapshot of the queue's counters.
    ///
    /// An item is counted as completed or failed when its capacity is
    /// released, which happens after its handle settles. Awaiting a handle
    /// therefore does not guarantee the snapshot already includes it; await
    /// [`wait_idle`](Self::wait_idle) first when exact counts matter.
    pub fn stats(&self) -> QueueStats {
        let state = self.shared.lock_state();
        QueueStats {
            pending: state.ring.len() as u64,
            running: state.running as u64,
            submitted: state.submitted,
            completed: state.completed,
            failed: state.failed,
            peak_running: state.peak_running as u64,
            is_paused: state.is_paused,
            is_stopped: state.is_stopped,
        }
    }
}

/// Capacity held by one running item.
///
/// [`settle`](Self::settle) releases it and starts the next waiting items.
/// If the slot is dropped instead, because the runtime shut down mid-action or
/// the spawned future never ran, the capacity is still released and the item
/// counts as failed. Waiting items are then left for the next submission or
/// [`AsyncTaskQueue::start`], since the runtime that would run them is going
/// away.
struct RunningSlot<P: ConcurrencyPolicy> {
    queue: AsyncTaskQueue<P>,
    task_id: TaskId,
    settled: bool,
}

impl<P: ConcurrencyPolicy> RunningSlot<P> {
    fn new(queue: AsyncTaskQueue<P>, task_id: TaskId) -> Self {
        Self {
            queue,
            task_id,
            settled: false,
        }
    }

    fn settle(mut self, runtime: &Handle, outcome: TaskOutcome) {
        self.settled = true;
        let batch = self.queue.release(outcome.is_success(), true);
        self.queue.dispatch(runtime, batch);
    }
}

impl<P: ConcurrencyPolicy> Drop for RunningSlot<P> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!(
            "🔨 [{}] Task {} dropped before settling",
            self.queue.shared.config.name,
            self.task_id
        );
        self.queue.release(false, false);
    }
}

impl<P: ConcurrencyPolicy> std::fmt::Debug for AsyncTaskQueue<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("AsyncTaskQueue")
            .field("id", &self.shared.id)
            .field("name", &self.shared.config.name)
            .field("policy", &self.shared.policy.label())
            .field("pending", &state.ring.len())
            .field("running", &state.running)
            .field("is_paused", &state.is_paused)
            .field("is_stopped", &state.is_stopped)
            .finish()
    }
}
