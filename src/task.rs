//! Task definitions: queued items, their handles and the typed task trait.

use crate::error::{AnvilError, AnvilResult};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Sequence number a task receives when it enters a queue.
pub type TaskId = u64;

type BoxedJob = Box<dyn FnOnce() -> BoxFuture<'static, TaskOutcome> + Send>;

/// How a task's action settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The action returned a value
    Resolved,
    /// The action returned an error
    Rejected,
    /// The action panicked
    Panicked,
}

impl TaskOutcome {
    /// Whether the submitter received a value.
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Resolved)
    }
}

/// Resolve/reject pair for the handle returned to a submitter.
struct Settler<T> {
    task_id: TaskId,
    tx: oneshot::Sender<AnvilResult<T>>,
}

impl<T> Settler<T> {
    fn resolve(self, value: T) {
        if self.tx.send(Ok(value)).is_err() {
            tracing::trace!("Handle for task {} dropped before resolve", self.task_id);
        }
    }

    fn reject(self, error: AnvilError) {
        if self.tx.send(Err(error)).is_err() {
            tracing::trace!("Handle for task {} dropped before reject", self.task_id);
        }
    }
}

/// One unit of submitted work waiting in a queue.
///
/// The item owns the action together with the sending half of the submitter's
/// handle. Running it settles the handle exactly once; dropping it unrun makes
/// the handle fail with [`AnvilError::Abandoned`].
pub struct QueueItem {
    id: TaskId,
    name: Option<&'static str>,
    enqueued_at: Instant,
    job: BoxedJob,
}

impl QueueItem {
    /// Wrap `action` into an item and return it with the submitter's handle.
    pub fn new<F, Fut, T>(id: TaskId, action: F) -> (Self, TaskHandle<T>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AnvilResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let settler = Settler { task_id: id, tx };

        let job: BoxedJob = Box::new(move || {
            async move {
                // The async block defers `action()` so a panic while building
                // the future is caught as well.
                let result = AssertUnwindSafe(async move { action().await })
                    .catch_unwind()
                    .await;

                match result {
                    Ok(Ok(value)) => {
                        settler.resolve(value);
                        TaskOutcome::Resolved
                    }
                    Ok(Err(error)) => {
                        settler.reject(error);
                        TaskOutcome::Rejected
                    }
                    Err(payload) => {
                        settler.reject(AnvilError::TaskPanicked {
                            message: panic_message(payload.as_ref()),
                        });
                        TaskOutcome::Panicked
                    }
                }
            }
            .boxed()
        });

        let item = Self {
            id,
            name: None,
            enqueued_at: Instant::now(),
            job,
        };
        (item, TaskHandle { id, rx })
    }

    /// Attach a name used in log fields.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Sequence number of this item.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Name given at submission, if any.
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Time spent waiting since submission.
    pub fn waited(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Run the action and settle the submitter's handle.
    pub async fn execute(self) -> TaskOutcome {
        (self.job)().await
    }
}

impl fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Future returned to a submitter, settling with its own action's result.
///
/// Dropping the handle does not cancel the task; the action still runs and
/// its result is discarded.
#[derive(Debug)]
#[must_use = "the handle is the only way to observe the task's result"]
pub struct TaskHandle<T> {
    id: TaskId,
    rx: oneshot::Receiver<AnvilResult<T>>,
}

impl<T> TaskHandle<T> {
    /// Sequence number of the submitted task.
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = AnvilResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let task_id = self.id;
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(AnvilError::Abandoned { task_id }),
        })
    }
}

/// Trait for typed tasks that can be submitted to any anvilq queue.
///
/// # Examples
///
/// ```rust
/// use anvilq::prelude::*;
///
/// struct Lookup {
///     query: String,
/// }
///
/// #[async_trait]
/// impl QueueTask for Lookup {
///     type Output = usize;
///
///     async fn run(self) -> AnvilResult<Self::Output> {
///         Ok(self.query.len())
///     }
/// }
/// ```
#[async_trait]
pub trait QueueTask: Send + Sized + 'static {
    /// The value delivered to the submitter
    type Output: Send + 'static;

    /// Execute the task.
    async fn run(self) -> AnvilResult<Self::Output>;

    /// Name used in log fields.
    ///
    /// By default, this returns the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
