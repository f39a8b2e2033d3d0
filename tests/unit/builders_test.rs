//! Tests for builder modules

use prometheus_deferred::builders::{build_scheduler, global_executor, SchedulerBuilder};
use prometheus_deferred::config::{SchedulerConfig, WorkerPoolConfig};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_build_scheduler_with_dedicated_pool() {
    let config = SchedulerConfig {
        monitor_thread_name: "builder-monitor".into(),
        pool: WorkerPoolConfig::new().with_worker_count(1),
    };
    let scheduler = build_scheduler(&config).unwrap();
    let task = scheduler.post(Duration::from_millis(5), || Ok(thread_name())).unwrap();
    assert_eq!(task.value(Some(Duration::from_secs(5))).as_deref(), Some("pl-worker-0"));

    scheduler.shutdown();
    assert!(scheduler.wait_for_termination(Some(Duration::from_secs(5))));
}

#[test]
fn test_default_builder_uses_global_executor() {
    let scheduler = SchedulerBuilder::new().build().unwrap();
    let task = scheduler.post(Duration::ZERO, || Ok(thread_name())).unwrap();
    let name = task.value(Some(Duration::from_secs(5))).unwrap();
    assert!(name.starts_with("pl-global-"), "unexpected thread {name}");
    assert!(Arc::strong_count(&global_executor().unwrap()) >= 2);

    scheduler.shutdown();
    assert!(scheduler.wait_for_termination(Some(Duration::from_secs(5))));
    assert!(global_executor().unwrap().is_running());
}

fn thread_name() -> String {
    std::thread::current().name().unwrap_or_default().to_string()
}
