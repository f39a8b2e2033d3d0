//! Native implementation of `WorkerPool` using OS threads.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel recv; waiters block on an event
//! - **Lock-free fast path**: atomic counters, brief sender lock on submit
//! - **Clean shutdown**: dropping the sender unblocks workers once the queue drains

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::event::Event;
use crate::core::executor::{Executor, Job};

use super::{PoolCounters, PoolError, PoolStats};

/// State shared between the pool handle and its workers.
struct PoolShared {
    counters: PoolCounters,
    /// Set by `kill`: workers drop remaining jobs instead of running them.
    killed: AtomicBool,
    live_workers: AtomicUsize,
    terminated: Event,
}

impl PoolShared {
    fn worker_exited(&self) {
        if self.live_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.terminated.set();
        }
    }
}

/// Worker pool with dedicated OS threads.
///
/// # Design
///
/// - **No polling**: workers block on channel recv
/// - **Clean shutdown**: dropping the sender lets workers drain and exit
/// - **Panic isolation**: a panicking job is counted and the worker keeps going
pub struct WorkerPool {
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Job sender (to workers). Option allows clean shutdown by dropping.
    job_tx: Mutex<Option<Sender<Job>>>,

    /// Counters, kill flag and termination signal.
    shared: Arc<PoolShared>,

    /// Shutdown flag (lock-free atomic).
    shutdown: AtomicBool,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a new worker pool with the given configuration.
    ///
    /// This spawns `config.worker_count` OS threads named
    /// `{thread_name_prefix}-{worker_id}`.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid and
    /// `PoolError::Internal` if a worker thread cannot be spawned.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (job_tx, job_rx) = if config.max_queue_depth == 0 {
            unbounded::<Job>()
        } else {
            bounded::<Job>(config.max_queue_depth)
        };
        let shared = Arc::new(PoolShared {
            counters: PoolCounters::default(),
            killed: AtomicBool::new(false),
            live_workers: AtomicUsize::new(0),
            terminated: Event::new(),
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            shared.live_workers.fetch_add(1, Ordering::AcqRel);
            match spawn_worker(worker_id, job_rx.clone(), Arc::clone(&shared), &config) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    shared.live_workers.fetch_sub(1, Ordering::AcqRel);
                    // Closing the channel lets the workers already started exit.
                    drop(job_tx);
                    return Err(PoolError::Internal(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = config.max_queue_depth,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            config,
            job_tx: Mutex::new(Some(job_tx)),
            shared,
            shutdown: AtomicBool::new(false),
            workers: Mutex::new(workers),
        })
    }

    /// Submit a job.
    ///
    /// The enqueue itself never blocks; it fails immediately if the queue is full.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the job queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn submit_job(&self, job: Job) -> Result<(), PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let job_tx_guard = self.job_tx.lock();
        let Some(job_tx) = job_tx_guard.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        // Count before sending so a fast worker never decrements below zero.
        self.shared.counters.queued_jobs.fetch_add(1, Ordering::Relaxed);
        match job_tx.try_send(job) {
            Ok(()) => {
                self.shared.counters.submitted_jobs.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.shared.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                warn!("Worker pool queue is full");
                Err(PoolError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.shared.counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);
                Err(PoolError::PoolShutdown)
            }
        }
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(
            self.config.worker_count,
            self.shared.live_workers.load(Ordering::Acquire),
        )
    }

    /// Whether the pool still accepts jobs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }

    /// Whether every worker has exited.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.is_set()
    }

    /// Stop accepting jobs. Queued jobs still run; workers exit once the queue drains.
    ///
    /// Does not block; pair with [`wait_for_termination`](Self::wait_for_termination).
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Shutting down worker pool");

        // Drop the sender to unblock all workers waiting on recv()
        self.job_tx.lock().take();
    }

    /// Stop accepting jobs and drop queued jobs unrun.
    ///
    /// Jobs already executing finish; their workers exit right after.
    pub fn kill(&self) {
        self.shared.killed.store(true, Ordering::Release);
        self.shutdown();
        warn!("Worker pool killed; queued jobs will be dropped");
    }

    /// Block until every worker has exited or `timeout` elapses (forever when `None`).
    ///
    /// Returns whether termination completed in time. Workers are joined on success.
    pub fn wait_for_termination(&self, timeout: Option<Duration>) -> bool {
        if !self.shared.terminated.wait(timeout) {
            return false;
        }

        let mut workers = self.workers.lock();
        let current = thread::current().id();
        let worker_count = workers.len();
        for (worker_id, worker) in workers.drain(..).enumerate() {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!(worker_id = worker_id, "Worker panicked");
            }
        }
        if worker_count > 0 {
            info!(worker_count = worker_count, "Worker pool shut down complete");
        }
        true
    }
}

impl Executor for WorkerPool {
    fn submit(&self, job: Job) -> bool {
        match self.submit_job(job) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "WorkerPool refused job");
                false
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown but DON'T join workers in Drop
        // This prevents hangs when pools are dropped with jobs still running
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.job_tx.lock().take();
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    worker_id: usize,
    job_rx: Receiver<Job>,
    shared: Arc<PoolShared>,
    config: &WorkerPoolConfig,
) -> std::io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("{}-{worker_id}", config.thread_name_prefix));
    if let Some(stack_size) = config.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder.spawn(move || {
        debug!(worker_id = worker_id, "Worker thread started");

        // Blocking recv; returns Err once the sender is dropped and the queue is empty.
        while let Ok(job) = job_rx.recv() {
            let counters = &shared.counters;
            counters.queued_jobs.fetch_sub(1, Ordering::Relaxed);

            if shared.killed.load(Ordering::Acquire) {
                counters.dropped_jobs.fetch_add(1, Ordering::Relaxed);
                drop(job);
                continue;
            }

            counters.active_jobs.fetch_add(1, Ordering::Relaxed);
            match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(()) => {
                    counters.completed_jobs.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    counters.panicked_jobs.fetch_add(1, Ordering::Relaxed);
                    warn!(worker_id = worker_id, "Job panicked; worker continues");
                }
            }
            counters.active_jobs.fetch_sub(1, Ordering::Relaxed);
        }

        debug!(worker_id = worker_id, "Worker thread exiting");
        shared.worker_exited();
    })
}
