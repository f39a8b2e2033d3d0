//! Worker pool with dedicated OS threads for running due tasks.
//!
//! The pool keeps blocking or CPU-bound task bodies off the scheduler's
//! monitor thread. Jobs travel over a `crossbeam-channel` queue to a fixed set
//! of named worker threads.
//!
//! # Key Features
//!
//! - **No polling**: workers block on `recv`; termination is an event wait
//! - **Admission control**: a bounded queue refuses jobs with `QueueFull`
//! - **Two-phase termination**: `shutdown`/`kill` signal, `wait_for_termination` waits
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use prometheus_deferred::config::WorkerPoolConfig;
//! use prometheus_deferred::core::WorkerPool;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new().with_worker_count(2)).unwrap();
//! pool.submit_job(Box::new(|| println!("hello from a worker"))).unwrap();
//!
//! pool.shutdown();
//! assert!(pool.wait_for_termination(Some(Duration::from_secs(5))));
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The job queue is full; no more jobs can be accepted.
    QueueFull,

    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (worker thread spawn failure, channel closed, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "job queue is full"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Worker threads still alive.
    pub live_workers: usize,

    /// Currently executing jobs.
    pub active_jobs: u64,

    /// Jobs waiting in the queue.
    pub queued_jobs: u64,

    /// Total jobs that returned normally.
    pub completed_jobs: u64,

    /// Total jobs that panicked.
    pub panicked_jobs: u64,

    /// Total jobs dropped unrun by `kill`.
    pub dropped_jobs: u64,

    /// Total jobs accepted.
    pub submitted_jobs: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_jobs: AtomicU64,
    pub queued_jobs: AtomicU64,
    pub completed_jobs: AtomicU64,
    pub panicked_jobs: AtomicU64,
    pub dropped_jobs: AtomicU64,
    pub submitted_jobs: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, live_workers: usize) -> PoolStats {
        PoolStats {
            worker_count,
            live_workers,
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            queued_jobs: self.queued_jobs.load(Ordering::Relaxed),
            completed_jobs: self.completed_jobs.load(Ordering::Relaxed),
            panicked_jobs: self.panicked_jobs.load(Ordering::Relaxed),
            dropped_jobs: self.dropped_jobs.load(Ordering::Relaxed),
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
        }
    }
}

pub use native::WorkerPool;
