//! Tests for configuration validation

use prometheus_deferred::config::pool::{ENV_MAX_QUEUE_DEPTH, ENV_MONITOR_THREAD_NAME};
use prometheus_deferred::config::{SchedulerConfig, WorkerPoolConfig};
use prometheus_deferred::core::SchedulerError;

#[test]
fn test_worker_pool_config_builders() {
    let config = WorkerPoolConfig::new()
        .with_worker_count(3)
        .with_max_queue_depth(16)
        .with_thread_stack_size(256 * 1024)
        .with_thread_name_prefix("inference");
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.max_queue_depth, 16);
    assert_eq!(config.thread_stack_size, Some(256 * 1024));
    assert_eq!(config.thread_name_prefix, "inference");
    assert!(config.validate().is_ok());
}

#[test]
fn test_worker_pool_config_invalid_worker_count() {
    let invalid = WorkerPoolConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "monitor_thread_name": "timers",
        "pool": { "worker_count": 2, "max_queue_depth": 100 }
    }"#;
    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.monitor_thread_name, "timers");
    assert_eq!(config.pool.worker_count, 2);
    assert_eq!(config.pool.max_queue_depth, 100);
    assert_eq!(config.pool.thread_name_prefix, "pl-worker");
    assert_eq!(config.pool.thread_stack_size, None);
}

#[test]
fn test_scheduler_config_from_empty_json_uses_defaults() {
    let config = SchedulerConfig::from_json_str("{}").unwrap();
    assert_eq!(config, SchedulerConfig::default());
}

#[test]
fn test_scheduler_config_invalid_json() {
    let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(msg) if msg.starts_with("parse error")));

    let err = SchedulerConfig::from_json_str(r#"{"pool": {"worker_count": 0}}"#).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(msg) if msg.contains("worker_count")));
}

#[test]
fn test_scheduler_config_round_trips_through_json() {
    let config = SchedulerConfig {
        monitor_thread_name: "timers".into(),
        pool: WorkerPoolConfig::new().with_worker_count(5),
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_scheduler_config_from_lookup() {
    let config = SchedulerConfig::from_lookup(|name| match name {
        ENV_MONITOR_THREAD_NAME => Some("env-timers".to_string()),
        ENV_MAX_QUEUE_DEPTH => Some("8".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.monitor_thread_name, "env-timers");
    assert_eq!(config.pool.max_queue_depth, 8);
}
