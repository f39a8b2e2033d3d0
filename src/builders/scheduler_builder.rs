//! Builders to construct schedulers and their executors from configuration.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::config::SchedulerConfig;
use crate::core::{Executor, Scheduler, SchedulerError, WorkerPool};

static GLOBAL_EXECUTOR: Mutex<Option<Arc<WorkerPool>>> = Mutex::new(None);

/// Process-wide worker pool shared by schedulers built without an explicit executor.
///
/// Created on first use from the default pool configuration and never shut down.
///
/// # Errors
///
/// Returns `SchedulerError::Backend` if the pool cannot be created.
pub fn global_executor() -> Result<Arc<WorkerPool>, SchedulerError> {
    let mut slot = GLOBAL_EXECUTOR.lock();
    if let Some(pool) = slot.as_ref() {
        return Ok(Arc::clone(pool));
    }
    let cfg = SchedulerConfig::default().pool.with_thread_name_prefix("pl-global");
    let pool = Arc::new(
        WorkerPool::new(cfg).map_err(|e| SchedulerError::Backend(format!("global executor: {e}")))?,
    );
    info!("global executor created");
    *slot = Some(Arc::clone(&pool));
    Ok(pool)
}

/// Where the built scheduler submits due tasks.
enum ExecutorChoice {
    Global,
    Dedicated,
    Explicit(Arc<dyn Executor>),
}

/// Composition root for [`Scheduler`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use prometheus_deferred::builders::SchedulerBuilder;
/// use prometheus_deferred::config::{SchedulerConfig, WorkerPoolConfig};
///
/// let config = SchedulerConfig {
///     pool: WorkerPoolConfig::new().with_worker_count(2),
///     ..SchedulerConfig::default()
/// };
/// let scheduler = SchedulerBuilder::new()
///     .with_config(config)
///     .with_dedicated_pool()
///     .build()
///     .unwrap();
///
/// let task = scheduler.post(Duration::from_millis(5), || Ok("done")).unwrap();
/// assert_eq!(task.value(Some(Duration::from_secs(5))), Some("done"));
/// ```
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    executor: ExecutorChoice,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Builder with the default configuration and the global executor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            executor: ExecutorChoice::Global,
        }
    }

    /// Use `config` for the monitor thread name and any dedicated pool.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Submit due tasks to `executor`.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = ExecutorChoice::Explicit(executor);
        self
    }

    /// Give the scheduler its own [`WorkerPool`] built from the pool configuration.
    #[must_use]
    pub fn with_dedicated_pool(mut self) -> Self {
        self.executor = ExecutorChoice::Dedicated;
        self
    }

    /// Validate the configuration and start the scheduler.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` for an invalid configuration and
    /// `SchedulerError::Backend` if a pool or the monitor thread cannot start.
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        self.config.validate().map_err(SchedulerError::InvalidConfig)?;

        let executor: Arc<dyn Executor> = match self.executor {
            ExecutorChoice::Global => global_executor()?,
            ExecutorChoice::Dedicated => Arc::new(
                WorkerPool::new(self.config.pool.clone())
                    .map_err(|e| SchedulerError::Backend(format!("worker pool: {e}")))?,
            ),
            ExecutorChoice::Explicit(executor) => executor,
        };
        Scheduler::with_thread_name(executor, self.config.monitor_thread_name)
    }
}

/// Build a scheduler with a dedicated pool from configuration.
///
/// # Errors
///
/// See [`SchedulerBuilder::build`].
pub fn build_scheduler(cfg: &SchedulerConfig) -> Result<Scheduler, SchedulerError> {
    SchedulerBuilder::new()
        .with_config(cfg.clone())
        .with_dedicated_pool()
        .build()
}
