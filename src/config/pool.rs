//! Worker pool and scheduler configuration structures.
//!
//! # Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `PL_MONITOR_THREAD_NAME` | `String` | `monitor_thread_name` |
//! | `PL_WORKER_COUNT` | `usize` | `pool.worker_count` |
//! | `PL_MAX_QUEUE_DEPTH` | `usize` | `pool.max_queue_depth` |
//! | `PL_THREAD_STACK_SIZE` | `usize` | `pool.thread_stack_size` |
//! | `PL_THREAD_NAME_PREFIX` | `String` | `pool.thread_name_prefix` |

use serde::{Deserialize, Serialize};

use crate::core::scheduler::DEFAULT_MONITOR_THREAD_NAME;
use crate::core::SchedulerError;

/// Environment variable name for the monitor thread name.
pub const ENV_MONITOR_THREAD_NAME: &str = "PL_MONITOR_THREAD_NAME";
/// Environment variable name for worker thread count.
pub const ENV_WORKER_COUNT: &str = "PL_WORKER_COUNT";
/// Environment variable name for job queue depth.
pub const ENV_MAX_QUEUE_DEPTH: &str = "PL_MAX_QUEUE_DEPTH";
/// Environment variable name for worker stack size.
pub const ENV_THREAD_STACK_SIZE: &str = "PL_THREAD_STACK_SIZE";
/// Environment variable name for worker thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "PL_THREAD_NAME_PREFIX";

/// Smallest stack size accepted for worker threads.
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of dedicated worker threads.
    pub worker_count: usize,
    /// Maximum queued jobs before `QueueFull`; 0 means unbounded.
    pub max_queue_depth: usize,
    /// Worker stack size in bytes; platform default when `None`.
    pub thread_stack_size: Option<usize>,
    /// Worker threads are named `{prefix}-{worker_id}`.
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            max_queue_depth: 0,
            thread_stack_size: None,
            thread_name_prefix: "pl-worker".into(),
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration (one worker per CPU, unbounded queue).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the job queue depth (0 = unbounded).
    #[must_use]
    pub const fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Set the worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, stack_size: usize) -> Self {
        self.thread_stack_size = Some(stack_size);
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if let Some(stack_size) = self.thread_stack_size {
            if stack_size < MIN_STACK_SIZE {
                return Err(format!("thread_stack_size must be at least {MIN_STACK_SIZE} bytes"));
            }
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name given to the monitor thread.
    pub monitor_thread_name: String,
    /// Worker pool that runs due tasks.
    pub pool: WorkerPoolConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitor_thread_name: DEFAULT_MONITOR_THREAD_NAME.into(),
            pool: WorkerPoolConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Validate the scheduler and its pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.monitor_thread_name.trim().is_empty() {
            return Err("monitor_thread_name must not be empty".into());
        }
        self.pool.validate().map_err(|e| format!("pool invalid: {e}"))
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedulerError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(cfg)
    }

    /// Defaults overridden by `PL_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if a variable is set but
    /// unparseable, or the result fails validation.
    pub fn from_env() -> Result<Self, SchedulerError> {
        // A missing .env file is the common case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by values from `lookup`, keyed by `PL_*` names.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SchedulerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(val) = lookup(ENV_MONITOR_THREAD_NAME) {
            cfg.monitor_thread_name = val;
        }
        if let Some(val) = lookup(ENV_WORKER_COUNT) {
            cfg.pool.worker_count = parse_usize(ENV_WORKER_COUNT, &val)?;
        }
        if let Some(val) = lookup(ENV_MAX_QUEUE_DEPTH) {
            cfg.pool.max_queue_depth = parse_usize(ENV_MAX_QUEUE_DEPTH, &val)?;
        }
        if let Some(val) = lookup(ENV_THREAD_STACK_SIZE) {
            cfg.pool.thread_stack_size = Some(parse_usize(ENV_THREAD_STACK_SIZE, &val)?);
        }
        if let Some(val) = lookup(ENV_THREAD_NAME_PREFIX) {
            cfg.pool.thread_name_prefix = val;
        }
        cfg.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(cfg)
    }
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize, SchedulerError> {
    val.trim().parse::<usize>().map_err(|e| {
        SchedulerError::InvalidConfig(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}
