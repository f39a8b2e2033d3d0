//! Tests for runtime adapters

use prometheus_deferred::core::{Executor, Scheduler};
use prometheus_deferred::runtime::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_on_current_tokio_runtime() {
    let executor = TokioExecutor::current().unwrap();
    let scheduler = Scheduler::new(Arc::new(executor) as Arc<dyn Executor>).unwrap();

    let task = scheduler.post(Duration::from_millis(10), || Ok(21 * 2)).unwrap();
    assert_eq!(task.value_async(Some(Duration::from_secs(5))).await, Some(42));

    scheduler.shutdown();
    let terminated = tokio::task::spawn_blocking(move || {
        scheduler.wait_for_termination(Some(Duration::from_secs(5)))
    })
    .await
    .unwrap();
    assert!(terminated);
}
