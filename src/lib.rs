//! # Prometheus Deferred
//!
//! A priority-ordered blocking queue and a deferred task scheduler.
//!
//! This library runs arbitrary units of work at a caller-chosen future time. Work
//! is keyed by a monotonic due instant in a concurrent priority queue; a dedicated
//! monitor thread parks until the earliest task is due and hands it to a
//! pluggable executor. Every task carries an observable result and can be
//! cancelled or rescheduled until the instant the scheduler commits to running it.
//!
//! ## Key Features
//!
//! - **Concurrent Priority Queue**: blocking, timed and non-blocking pops over any comparator
//! - **Linearizable Cancellation**: `cancel`/`reschedule` race the monitor with exactly one winner
//! - **No Polling**: the monitor waits on a condition variable bounded by the next due instant
//! - **Pluggable Executors**: dedicated worker threads, a tokio runtime, or inline execution
//! - **Two-Phase Termination**: `shutdown`/`kill` signal, `wait_for_termination` waits
//!
//! ## Scheduler
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_deferred::config::WorkerPoolConfig;
//! use prometheus_deferred::core::{Scheduler, WorkerPool};
//!
//! let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::new().with_worker_count(2)).unwrap());
//! let scheduler = Scheduler::new(pool).unwrap();
//!
//! let report = scheduler.post(Duration::from_millis(20), || Ok("report ready")).unwrap();
//! let stale = scheduler.post(Duration::from_secs(10), || Ok("never runs")).unwrap();
//! assert!(stale.cancel());
//!
//! assert_eq!(report.value(Some(Duration::from_secs(5))), Some("report ready"));
//! assert_eq!(stale.value(Some(Duration::ZERO)), None);
//!
//! scheduler.shutdown();
//! assert!(scheduler.wait_for_termination(Some(Duration::from_secs(5))));
//! ```
//!
//! ## Priority Queue
//!
//! ```rust
//! use std::time::Duration;
//! use prometheus_deferred::infra::PriorityBlockingQueue;
//!
//! let queue = PriorityBlockingQueue::<u32>::min_first();
//! queue.push(3).push(1).push(2);
//! assert_eq!(queue.pop(), 1);
//! assert_eq!(queue.poll(Some(Duration::from_millis(10))), Some(2));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, the scheduler and its executors.
pub mod core;
/// Configuration models for the scheduler and its worker pool.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for in-process queues.
pub mod infra;
/// Runtime adapters executing jobs on an async runtime.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::{global_executor, SchedulerBuilder};
pub use crate::config::{SchedulerConfig, WorkerPoolConfig};
pub use crate::core::{
    AppResult, Executor, ImmediateExecutor, Job, PoolError, RunState, ScheduledTask, Scheduler,
    SchedulerError, TaskError, TaskState, WorkerPool,
};
pub use crate::infra::PriorityBlockingQueue;
