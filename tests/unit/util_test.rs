//! Tests for utility functions

use prometheus_deferred::util::{deadline_after, duration_from_secs, millis, remaining};
use std::time::{Duration, Instant};

#[test]
fn test_duration_from_secs() {
    assert_eq!(duration_from_secs(1.5).unwrap(), Duration::from_millis(1500));
    assert!(duration_from_secs(-1.0).is_err());
}

#[test]
fn test_deadline_roundtrip() {
    let deadline = deadline_after(Duration::from_secs(2));
    assert!(deadline > Instant::now());
    assert!(remaining(deadline) <= Duration::from_secs(2));
    assert_eq!(millis(Duration::from_secs(2)), 2000);
}
