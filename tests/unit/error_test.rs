//! Tests for error types

use prometheus_deferred::core::{PoolError, SchedulerError, TaskError};
use std::sync::Arc;

#[test]
fn test_invalid_argument_error() {
    let err = SchedulerError::InvalidArgument("delay must be non-negative".to_string());
    assert_eq!(format!("{}", err), "invalid argument: delay must be non-negative");
}

#[test]
fn test_empty_queue_error() {
    let err = SchedulerError::EmptyQueue;
    assert_eq!(format!("{}", err), "queue is empty");
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
}

#[test]
fn test_task_error_reasons() {
    assert_eq!(format!("{}", TaskError::Cancelled), "task was cancelled");
    assert_eq!(
        format!("{}", TaskError::Panicked("index out of bounds".into())),
        "task panicked: index out of bounds"
    );
    let failed = TaskError::Failed(Arc::new(anyhow::anyhow!("tokenizer missing")));
    assert_eq!(format!("{}", failed.clone()), "task failed: tokenizer missing");
}

#[test]
fn test_errors_convert_to_anyhow() {
    let err: anyhow::Error = SchedulerError::NotRunning.into();
    assert_eq!(err.to_string(), "scheduler is not running");
    let err: anyhow::Error = PoolError::QueueFull.into();
    assert_eq!(err.to_string(), "job queue is full");
}
