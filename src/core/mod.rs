//! Core scheduling abstractions: tasks, the scheduler and its executors.

pub mod entry;
pub mod error;
pub mod event;
pub mod executor;
pub mod scheduler;
pub mod task;
pub mod worker_pool;

pub use entry::{Comparator, KeyedEntry, QueueOrder};
pub use error::{AppResult, SchedulerError, TaskError};
pub use event::Event;
pub use executor::{Executor, ImmediateExecutor, Job};
pub use scheduler::{RunState, Scheduler};
pub use task::{ScheduledTask, TaskId, TaskSnapshot, TaskState};
pub use worker_pool::{PoolError, PoolStats, WorkerPool};
