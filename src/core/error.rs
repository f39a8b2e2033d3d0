//! Error types for queue, task and scheduler operations.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced synchronously by queue and scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A caller-supplied argument was rejected (negative delay, missing item).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A non-blocking pop found no entries.
    #[error("queue is empty")]
    EmptyQueue,
    /// The scheduler is shutting down or terminated and refuses new work.
    #[error("scheduler is not running")]
    NotRunning,
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why a scheduled task did not produce a value.
///
/// Cloneable so every observer of a task can receive the same reason.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task was cancelled before it was handed to the backend.
    #[error("task was cancelled")]
    Cancelled,
    /// The task body returned an error.
    #[error("task failed: {0}")]
    Failed(Arc<anyhow::Error>),
    /// The task body panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was refused before it could run (backend refused the job).
    #[error("task rejected: {0}")]
    Rejected(String),
}

impl TaskError {
    /// Returns true for the cancellation reason.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Application-facing result using anyhow; task bodies return this.
pub type AppResult<T> = Result<T, anyhow::Error>;
