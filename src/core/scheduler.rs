//! Deferred task scheduler: a monitor thread draining a due-time queue.
//!
//! # Design
//!
//! - **One monitor per scheduler**: a dedicated named thread parks on the
//!   queue until the earliest task is due, or until a push or shutdown wakes it.
//! - **No polling**: waits are `Condvar::wait_until` on the earliest due instant.
//! - **Executor decoupled**: due tasks are submitted as jobs to an injected
//!   [`Executor`]; bodies never run under any scheduler lock.
//! - **Two-phase termination**: `shutdown`/`kill` signal, `wait_for_termination` waits.
//!
//! Lock order is task, then run state, then queue. The monitor reads due
//! instants from the immutable queue entries, so it never takes a task lock
//! while holding the queue lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::event::Event;
use crate::core::executor::Executor;
use crate::core::task::{Dispatch, ScheduledTask, TaskCore, TaskId, TaskState};
use crate::core::{AppResult, SchedulerError, TaskError};
use crate::infra::queue::PriorityBlockingQueue;
use crate::util::clock;

/// Default name for the monitor thread.
pub const DEFAULT_MONITOR_THREAD_NAME: &str = "pl-timer-monitor";

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Accepting new tasks.
    Running,
    /// Shutdown requested; the monitor is stopping.
    ShuttingDown,
    /// The monitor has stopped (or was detached by `kill`).
    Terminated,
}

/// Queue entry: a task keyed by the due instant it was pushed with.
///
/// Rescheduling removes the entry and pushes a fresh one.
pub(crate) struct PendingEntry {
    due_at: Instant,
    seq: u64,
    task_id: TaskId,
    task: Arc<dyn Dispatch>,
}

impl PendingEntry {
    // Ties on due time fall back to push order.
    fn cmp_due(a: &Self, b: &Self) -> std::cmp::Ordering {
        a.due_at.cmp(&b.due_at).then(a.seq.cmp(&b.seq))
    }
}

/// State shared by the scheduler handle, its monitor and its tasks.
pub(crate) struct SchedulerShared {
    queue: PriorityBlockingQueue<PendingEntry>,
    run_state: Mutex<RunState>,
    stop: AtomicBool,
    terminated: Event,
    next_id: AtomicU64,
}

impl SchedulerShared {
    fn new() -> Self {
        Self {
            queue: PriorityBlockingQueue::min_by(PendingEntry::cmp_due),
            run_state: Mutex::new(RunState::Running),
            stop: AtomicBool::new(false),
            terminated: Event::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn push_entry(&self, due_at: Instant, task_id: TaskId, task: Arc<dyn Dispatch>) {
        self.queue.push(PendingEntry {
            due_at,
            seq: self.next_id(),
            task_id,
            task,
        });
    }

    /// Replace a queued task's entry with one due at `due_at`.
    ///
    /// Fails if the scheduler is no longer running or the monitor already
    /// took the entry.
    pub(crate) fn requeue(&self, task_id: TaskId, due_at: Instant, task: Arc<dyn Dispatch>) -> bool {
        let run_state = self.run_state.lock();
        if *run_state != RunState::Running {
            return false;
        }
        if self.queue.remove_first(|entry| entry.task_id == task_id).is_none() {
            return false;
        }
        self.push_entry(due_at, task_id, task);
        true
    }

    /// Drop a task's entry from the queue, if still there.
    pub(crate) fn forget(&self, task_id: TaskId) {
        self.queue.remove_first(|entry| entry.task_id == task_id);
    }

    fn cancel_queued(&self) -> usize {
        self.queue
            .drain()
            .into_iter()
            .filter(|entry| entry.task.cancel())
            .count()
    }

    fn mark_terminated(&self) {
        *self.run_state.lock() = RunState::Terminated;
        self.terminated.set();
    }
}

const REFUSED_REASON: &str = "executor refused the task";
const DROPPED_REASON: &str = "executor dropped the task";

// Hand-off states between `dispatch` and the job it submits.
const IN_SUBMIT: u8 = 0;
const SUBMITTED: u8 = 1;
const DROPPED_IN_SUBMIT: u8 = 2;

/// Runs the job's task, or rejects it if the executor drops the job unrun.
///
/// A drop while `submit` is still on the stack is left to `dispatch`, which
/// then knows whether the executor refused the job or accepted and lost it.
struct PostedJob {
    task: Option<Arc<dyn Dispatch>>,
    handoff: Arc<AtomicU8>,
}

impl PostedJob {
    fn run(mut self) {
        if let Some(task) = self.task.take() {
            task.run();
        }
    }
}

impl Drop for PostedJob {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let deferred = self
            .handoff
            .compare_exchange(IN_SUBMIT, DROPPED_IN_SUBMIT, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !deferred {
            task.reject(TaskError::Rejected(DROPPED_REASON.into()));
        }
    }
}

fn dispatch(executor: &dyn Executor, task: Arc<dyn Dispatch>) {
    let task_id = task.id();
    let handoff = Arc::new(AtomicU8::new(IN_SUBMIT));
    let job = PostedJob {
        task: Some(Arc::clone(&task)),
        handoff: Arc::clone(&handoff),
    };
    let accepted = executor.submit(Box::new(move || job.run()));
    let dropped = handoff.swap(SUBMITTED, Ordering::AcqRel) == DROPPED_IN_SUBMIT;
    match (accepted, dropped) {
        (true, false) => debug!(task_id, "task posted to executor"),
        (true, true) => {
            warn!(task_id, "executor dropped task");
            task.reject(TaskError::Rejected(DROPPED_REASON.into()));
        }
        (false, _) => {
            warn!(task_id, "executor refused task");
            task.reject(TaskError::Rejected(REFUSED_REASON.into()));
        }
    }
}

fn monitor_loop(shared: &SchedulerShared, executor: &dyn Executor) {
    info!("scheduler monitor started");
    while let Some(entry) = shared
        .queue
        .pop_due(|entry| entry.due_at, || shared.stop.load(Ordering::Acquire))
    {
        if entry.task.claim() {
            dispatch(executor, entry.task);
        } else {
            debug!(task_id = entry.task_id, "skipping task that left pending state");
        }
    }
    let cancelled = shared.cancel_queued();
    shared.mark_terminated();
    info!(cancelled, "scheduler monitor stopped");
}

/// Executes tasks after a delay on an injected [`Executor`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use prometheus_deferred::core::{ImmediateExecutor, Scheduler};
///
/// let scheduler = Scheduler::new(Arc::new(ImmediateExecutor)).unwrap();
/// let task = scheduler.post(Duration::from_millis(10), || Ok(2 + 2)).unwrap();
/// assert_eq!(task.value(Some(Duration::from_secs(5))), Some(4));
///
/// scheduler.shutdown();
/// assert!(scheduler.wait_for_termination(Some(Duration::from_secs(5))));
/// ```
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
    executor: Arc<dyn Executor>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler submitting due tasks to `executor`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Backend` if the monitor thread cannot be spawned.
    pub fn new(executor: Arc<dyn Executor>) -> Result<Self, SchedulerError> {
        Self::with_thread_name(executor, DEFAULT_MONITOR_THREAD_NAME)
    }

    /// Create a scheduler whose monitor thread carries `name`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Backend` if the monitor thread cannot be spawned.
    pub fn with_thread_name(
        executor: Arc<dyn Executor>,
        name: impl Into<String>,
    ) -> Result<Self, SchedulerError> {
        let name = name.into();
        let shared = Arc::new(SchedulerShared::new());
        let monitor = thread::Builder::new()
            .name(name.clone())
            .spawn({
                let shared = Arc::clone(&shared);
                let executor = Arc::clone(&executor);
                move || monitor_loop(&shared, executor.as_ref())
            })
            .map_err(|e| SchedulerError::Backend(format!("failed to spawn monitor thread: {e}")))?;

        info!(thread = %name, "scheduler initialized");
        Ok(Self {
            shared,
            executor,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    /// Run `body` once `delay` has elapsed.
    ///
    /// A zero delay submits straight to the executor, bypassing the queue.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotRunning` once shutdown has begun.
    pub fn post<T, F>(&self, delay: Duration, body: F) -> Result<ScheduledTask<T>, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce() -> AppResult<T> + Send + 'static,
    {
        let run_state = self.shared.run_state.lock();
        if *run_state != RunState::Running {
            debug!("post refused: scheduler not running");
            return Err(SchedulerError::NotRunning);
        }

        let task_id = self.shared.next_id();
        let due_at = clock::deadline_after(delay);
        let state = if delay.is_zero() {
            TaskState::Posted
        } else {
            TaskState::Pending
        };
        let core = Arc::new(TaskCore::new(
            task_id,
            delay,
            due_at,
            state,
            Box::new(body),
            Arc::downgrade(&self.shared),
        ));

        if delay.is_zero() {
            drop(run_state);
            dispatch(self.executor.as_ref(), Arc::clone(&core) as Arc<dyn Dispatch>);
        } else {
            self.shared.push_entry(due_at, task_id, Arc::clone(&core) as Arc<dyn Dispatch>);
            drop(run_state);
            debug!(task_id, delay_ms = clock::millis(delay), "task scheduled");
        }
        Ok(ScheduledTask::from_core(core))
    }

    /// [`post`](Self::post) taking the delay in fractional seconds.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidArgument` for a negative or non-finite
    /// delay and `SchedulerError::NotRunning` once shutdown has begun.
    pub fn post_secs<T, F>(&self, delay_secs: f64, body: F) -> Result<ScheduledTask<T>, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce() -> AppResult<T> + Send + 'static,
    {
        let delay = clock::duration_from_secs(delay_secs)?;
        self.post(delay, body)
    }

    /// Stop accepting tasks, cancel everything still pending and stop the monitor.
    ///
    /// Posted and processing tasks run to completion. Does not block; pair
    /// with [`wait_for_termination`](Self::wait_for_termination).
    pub fn shutdown(&self) {
        {
            let mut run_state = self.shared.run_state.lock();
            if *run_state != RunState::Running {
                return;
            }
            *run_state = RunState::ShuttingDown;
        }
        let cancelled = self.shared.cancel_queued();
        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue.wake_all();
        info!(cancelled, "scheduler shutting down");
    }

    /// Like [`shutdown`](Self::shutdown), but terminates immediately and
    /// detaches the monitor thread instead of waiting for it.
    pub fn kill(&self) {
        self.shutdown();
        let detached = self.monitor.lock().take();
        if detached.is_some() {
            self.shared.mark_terminated();
            warn!("scheduler killed; monitor thread detached");
        }
    }

    /// Block until the scheduler terminates or `timeout` elapses (forever when `None`).
    ///
    /// Returns whether termination completed in time.
    pub fn wait_for_termination(&self, timeout: Option<Duration>) -> bool {
        if !self.shared.terminated.wait(timeout) {
            return false;
        }
        let monitor = self.monitor.lock().take();
        if let Some(handle) = monitor {
            if handle.thread().id() == thread::current().id() {
                // Called from a task running inline on the monitor itself.
                return true;
            }
            if handle.join().is_err() {
                warn!("scheduler monitor thread panicked");
            }
        }
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        *self.shared.run_state.lock()
    }

    /// Accepting new tasks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    /// Shutdown requested but the monitor has not stopped yet.
    #[must_use]
    pub fn is_shuttingdown(&self) -> bool {
        self.run_state() == RunState::ShuttingDown
    }

    /// Fully terminated.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.run_state() == RunState::Terminated
    }

    /// Number of tasks waiting in the queue.
    #[must_use]
    pub fn scheduled_task_count(&self) -> usize {
        self.shared.queue.len()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("run_state", &self.run_state())
            .field("queued", &self.scheduled_task_count())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Signal only; joining here could hang on a slow executor.
        if self.is_running() {
            debug!("scheduler dropped without explicit shutdown");
            self.shutdown();
        }
    }
}
