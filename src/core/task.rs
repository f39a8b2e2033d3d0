//! Scheduled tasks: a cancellable, reschedulable unit of deferred work.
//!
//! A task moves through
//! `Pending -> Posted -> Processing -> {Fulfilled | Rejected}`, with
//! `Pending -> Cancelled` as the only other exit. Every transition happens
//! under the task's own mutex, so a caller racing `cancel`/`reschedule`
//! against the monitor sees exactly one outcome.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::event::Event;
use crate::core::scheduler::SchedulerShared;
use crate::core::{AppResult, SchedulerError, TaskError};
use crate::util::clock;

/// Task identifier, unique within one scheduler.
pub type TaskId = u64;

/// Boxed task body.
pub(crate) type Body<T> = Box<dyn FnOnce() -> AppResult<T> + Send + 'static>;

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the scheduler queue for its due time.
    Pending,
    /// Removed from the queue and handed to the executor.
    Posted,
    /// The body is running.
    Processing,
    /// The body returned a value.
    Fulfilled,
    /// The body failed, panicked, or the executor refused it.
    Rejected,
    /// Cancelled before it was posted.
    Cancelled,
}

impl TaskState {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected | Self::Cancelled)
    }
}

/// Serializable point-in-time view of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub id: TaskId,
    /// Current state.
    pub state: TaskState,
    /// Delay requested at creation, in milliseconds.
    pub initial_delay_ms: u64,
    /// Time left until the due instant, in milliseconds (0 once due).
    pub due_in_ms: u64,
    /// Failure or cancellation reason, if any.
    pub reason: Option<String>,
}

struct TaskInner<T> {
    state: TaskState,
    due_at: Instant,
    body: Option<Body<T>>,
    value: Option<T>,
    reason: Option<TaskError>,
}

/// Shared task state; the scheduler queue and every handle point at one of these.
pub(crate) struct TaskCore<T> {
    id: TaskId,
    initial_delay: Duration,
    inner: Mutex<TaskInner<T>>,
    completed: Event,
    scheduler: Weak<SchedulerShared>,
}

/// Type-erased view of a task used by the scheduler and its executor jobs.
pub(crate) trait Dispatch: Send + Sync {
    /// Task identifier.
    fn id(&self) -> TaskId;
    /// `Pending -> Posted`. False if the task left `Pending` first.
    fn claim(&self) -> bool;
    /// `Posted -> Processing -> {Fulfilled | Rejected}`.
    fn run(&self);
    /// `Posted -> Rejected` when the job never ran.
    fn reject(&self, reason: TaskError);
    /// `Pending -> Cancelled`.
    fn cancel(&self) -> bool;
}

impl<T: Send + 'static> TaskCore<T> {
    pub(crate) fn new(
        id: TaskId,
        initial_delay: Duration,
        due_at: Instant,
        state: TaskState,
        body: Body<T>,
        scheduler: Weak<SchedulerShared>,
    ) -> Self {
        Self {
            id,
            initial_delay,
            inner: Mutex::new(TaskInner {
                state,
                due_at,
                body: Some(body),
                value: None,
                reason: None,
            }),
            completed: Event::new(),
            scheduler,
        }
    }

    fn finish(&self, state: TaskState, value: Option<T>, reason: Option<TaskError>) {
        {
            let mut inner = self.inner.lock();
            inner.state = state;
            inner.value = value;
            inner.reason = reason;
        }
        self.completed.set();
    }
}

impl<T: Send + 'static> Dispatch for TaskCore<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn claim(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != TaskState::Pending {
            return false;
        }
        inner.state = TaskState::Posted;
        true
    }

    fn run(&self) {
        let body = {
            let mut inner = self.inner.lock();
            if inner.state != TaskState::Posted {
                return;
            }
            inner.state = TaskState::Processing;
            inner.body.take()
        };
        let Some(body) = body else {
            self.finish(
                TaskState::Rejected,
                None,
                Some(TaskError::Rejected("task body already consumed".into())),
            );
            return;
        };

        tracing::debug!(task_id = self.id, "task processing");
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => {
                self.finish(TaskState::Fulfilled, Some(value), None);
                tracing::debug!(task_id = self.id, "task fulfilled");
            }
            Ok(Err(err)) => {
                tracing::debug!(task_id = self.id, error = %err, "task rejected");
                self.finish(TaskState::Rejected, None, Some(TaskError::Failed(Arc::new(err))));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(task_id = self.id, panic = %message, "task body panicked");
                self.finish(TaskState::Rejected, None, Some(TaskError::Panicked(message)));
            }
        }
    }

    fn reject(&self, reason: TaskError) {
        let body = {
            let mut inner = self.inner.lock();
            if inner.state != TaskState::Posted {
                return;
            }
            inner.state = TaskState::Rejected;
            inner.reason = Some(reason);
            inner.body.take()
        };
        drop(body);
        self.completed.set();
    }

    fn cancel(&self) -> bool {
        let body = {
            let mut inner = self.inner.lock();
            if inner.state != TaskState::Pending {
                return false;
            }
            inner.state = TaskState::Cancelled;
            inner.reason = Some(TaskError::Cancelled);
            inner.body.take()
        };
        drop(body);
        if let Some(shared) = self.scheduler.upgrade() {
            shared.forget(self.id);
        }
        self.completed.set();
        tracing::debug!(task_id = self.id, "task cancelled");
        true
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Observer handle for a task posted to a [`Scheduler`](crate::core::Scheduler).
///
/// Handles are cheap to clone; all clones observe the same task.
pub struct ScheduledTask<T> {
    core: Arc<TaskCore<T>>,
}

impl<T> Clone for ScheduledTask<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> ScheduledTask<T> {
    pub(crate) fn from_core(core: Arc<TaskCore<T>>) -> Self {
        Self { core }
    }

    /// Task identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.core.id
    }

    /// Delay requested when the task was posted.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.core.initial_delay
    }

    /// Monotonic instant at which the task becomes eligible to run.
    #[must_use]
    pub fn due_at(&self) -> Instant {
        self.core.inner.lock().due_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.core.inner.lock().state
    }

    /// Still waiting in the queue.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == TaskState::Pending
    }

    /// Handed to the executor but not started.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        self.state() == TaskState::Posted
    }

    /// Body currently running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.state() == TaskState::Processing
    }

    /// Completed with a value.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.state() == TaskState::Fulfilled
    }

    /// Completed with an error (including executor refusal).
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state() == TaskState::Rejected
    }

    /// Cancelled before it was posted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Reached a terminal state.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }

    /// Cancel the task if it is still pending.
    ///
    /// Returns false, with no effect, once the scheduler has posted the task.
    pub fn cancel(&self) -> bool {
        self.core.cancel()
    }

    /// Move the due time to `delay` from now.
    ///
    /// Succeeds only while the task is pending in a running scheduler.
    pub fn reschedule(&self, delay: Duration) -> bool {
        let mut inner = self.core.inner.lock();
        if inner.state != TaskState::Pending {
            return false;
        }
        let Some(shared) = self.core.scheduler.upgrade() else {
            return false;
        };
        let due_at = clock::deadline_after(delay);
        let dispatch = Arc::clone(&self.core) as Arc<dyn Dispatch>;
        if !shared.requeue(self.core.id, due_at, dispatch) {
            return false;
        }
        inner.due_at = due_at;
        tracing::debug!(task_id = self.core.id, delay_ms = clock::millis(delay), "task rescheduled");
        true
    }

    /// [`reschedule`](Self::reschedule) taking fractional seconds.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidArgument` for a negative or non-finite
    /// delay; the due time is left unchanged.
    pub fn reschedule_secs(&self, delay_secs: f64) -> Result<bool, SchedulerError> {
        let delay = clock::duration_from_secs(delay_secs)?;
        Ok(self.reschedule(delay))
    }

    /// Reschedule using the delay the task was originally posted with.
    pub fn reset(&self) -> bool {
        self.reschedule(self.core.initial_delay)
    }

    /// Block until the task completes or `timeout` elapses (forever when `None`).
    ///
    /// Returns whether the task is complete.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.core.completed.wait(timeout)
    }

    /// Failure or cancellation reason, if the task has one.
    #[must_use]
    pub fn reason(&self) -> Option<TaskError> {
        self.core.inner.lock().reason.clone()
    }

    /// Point-in-time view of the task.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        let inner = self.core.inner.lock();
        TaskSnapshot {
            id: self.core.id,
            state: inner.state,
            initial_delay_ms: clock::millis(self.core.initial_delay),
            due_in_ms: clock::millis(clock::remaining(inner.due_at)),
            reason: inner.reason.as_ref().map(ToString::to_string),
        }
    }
}

impl<T: Clone + Send + 'static> ScheduledTask<T> {
    /// Wait for the value.
    ///
    /// Returns `None` on timeout, rejection or cancellation.
    pub fn value(&self, timeout: Option<Duration>) -> Option<T> {
        self.wait(timeout);
        self.core.inner.lock().value.clone()
    }

    /// Wait for the value, surfacing the failure reason as an error.
    ///
    /// Returns `Ok(None)` if the timeout elapses first.
    ///
    /// # Errors
    ///
    /// Returns the task's [`TaskError`] when it was rejected or cancelled.
    pub fn value_checked(&self, timeout: Option<Duration>) -> Result<Option<T>, TaskError> {
        self.wait(timeout);
        let inner = self.core.inner.lock();
        match &inner.reason {
            Some(reason) => Err(reason.clone()),
            None => Ok(inner.value.clone()),
        }
    }

    /// The value if the task has already been fulfilled.
    #[must_use]
    pub fn try_value(&self) -> Option<T> {
        self.core.inner.lock().value.clone()
    }

    /// Async [`value`](Self::value); the wait runs on tokio's blocking pool.
    #[cfg(feature = "tokio-runtime")]
    pub async fn value_async(&self, timeout: Option<Duration>) -> Option<T> {
        let task = self.clone();
        tokio::task::spawn_blocking(move || task.value(timeout))
            .await
            .ok()
            .flatten()
    }
}

impl<T> fmt::Debug for ScheduledTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.inner.lock().state;
        f.debug_struct("ScheduledTask")
            .field("id", &self.core.id)
            .field("state", &state)
            .field("initial_delay", &self.core.initial_delay)
            .finish()
    }
}
