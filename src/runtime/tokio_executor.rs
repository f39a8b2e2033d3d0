//! Tokio runtime executor implementation.

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tracing::debug;

use crate::core::{Executor, Job};

/// Executor that runs jobs on a tokio runtime's blocking thread pool.
///
/// Task bodies are synchronous and may block, so they go through
/// `spawn_blocking` rather than onto the async worker threads.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    /// Keeps an owned runtime alive for as long as any clone exists.
    owned: Option<Arc<Runtime>>,
}

impl TokioExecutor {
    /// Create a `TokioExecutor` from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
            owned: None,
        }
    }

    /// Create a `TokioExecutor` on the runtime the caller is running in.
    ///
    /// Returns `None` outside a tokio runtime context.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Create a `TokioExecutor` with its own multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while building the runtime.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("pl-tokio")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(Arc::new(runtime)),
        })
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, job: Job) -> bool {
        // A shut-down runtime drops the job, which rejects the task it carries.
        drop(self.handle.spawn_blocking(job));
        debug!("job handed to tokio blocking pool");
        true
    }
}

impl std::fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("owns_runtime", &self.owned.is_some())
            .finish_non_exhaustive()
    }
}
