//! Work-executing backend abstraction.
//!
//! The scheduler hands due tasks to an [`Executor`] and never runs bodies on
//! its own monitor thread (unless the executor itself is inline).

use std::fmt;

/// A unit of fire-and-forget work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Backend that accepts jobs for execution.
///
/// Implementations must invoke each accepted job at most once and must not
/// be assumed to run it synchronously or on any particular thread. A backend
/// that is shut down returns `false` and drops the job.
///
/// # Example
///
/// ```rust
/// use prometheus_deferred::core::{Executor, Job};
///
/// struct ThreadPerJob;
///
/// impl Executor for ThreadPerJob {
///     fn submit(&self, job: Job) -> bool {
///         std::thread::Builder::new().spawn(job).is_ok()
///     }
/// }
/// ```
pub trait Executor: Send + Sync {
    /// Submit a job. Returns whether it was accepted.
    fn submit(&self, job: Job) -> bool;
}

/// Runs every job on the submitting thread before `submit` returns.
///
/// Useful for tests and for bodies that are trivially cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    fn submit(&self, job: Job) -> bool {
        job();
        true
    }
}

impl fmt::Debug for dyn Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Executor")
    }
}
