//! Comprehensive integration tests for WorkerPool
//!
//! These tests validate real-world functionality including:
//! - Basic job execution on dedicated threads
//! - Concurrent job submission
//! - Queue depth limits
//! - Graceful shutdown and termination waits
//! - Use as the scheduler's executor

use prometheus_deferred::config::WorkerPoolConfig;
use prometheus_deferred::core::{Executor, PoolError, Scheduler, WorkerPool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const WAIT: Option<Duration> = Some(Duration::from_secs(10));

fn make_pool(workers: usize, depth: usize) -> WorkerPool {
    WorkerPool::new(
        WorkerPoolConfig::new()
            .with_worker_count(workers)
            .with_max_queue_depth(depth)
            .with_thread_name_prefix("test-worker"),
    )
    .unwrap()
}

/// Tracks how many jobs overlap in time.
#[derive(Clone, Default)]
struct ConcurrencyProbe {
    execution_count: Arc<AtomicU64>,
    concurrent_count: Arc<AtomicU64>,
    max_concurrent: Arc<AtomicU64>,
}

impl ConcurrencyProbe {
    fn job(&self, work: Duration) -> Box<dyn FnOnce() + Send> {
        let probe = self.clone();
        Box::new(move || {
            let now = probe.concurrent_count.fetch_add(1, Ordering::SeqCst) + 1;
            probe.max_concurrent.fetch_max(now, Ordering::SeqCst);
            thread::sleep(work);
            probe.concurrent_count.fetch_sub(1, Ordering::SeqCst);
            probe.execution_count.fetch_add(1, Ordering::SeqCst);
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_jobs_run_on_named_worker_threads() {
    let pool = make_pool(2, 10);
    let (tx, rx) = mpsc::channel();
    for _ in 0..4 {
        let tx = tx.clone();
        pool.submit_job(Box::new(move || {
            tx.send(thread::current().name().unwrap_or_default().to_string()).unwrap();
        }))
        .unwrap();
    }

    for _ in 0..4 {
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(name.starts_with("test-worker-"), "unexpected thread {name}");
    }
    pool.shutdown();
    assert!(pool.wait_for_termination(WAIT));
}

#[test]
fn test_concurrent_execution() {
    let pool = make_pool(4, 100);
    let probe = ConcurrencyProbe::default();

    let start = Instant::now();
    for _ in 0..8 {
        pool.submit_job(probe.job(Duration::from_millis(100))).unwrap();
    }
    pool.shutdown();
    assert!(pool.wait_for_termination(WAIT));

    assert_eq!(probe.execution_count.load(Ordering::SeqCst), 8);
    assert!(probe.max_concurrent.load(Ordering::SeqCst) <= 4);
    assert!(probe.max_concurrent.load(Ordering::SeqCst) >= 2);
    // 8 jobs of 100ms on 4 workers should take ~200ms, far from serial 800ms.
    assert!(start.elapsed() < Duration::from_millis(700));
}

#[test]
fn test_queue_depth_limit() {
    let pool = make_pool(1, 2);
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel();
    pool.submit_job(Box::new(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    }))
    .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    pool.submit_job(Box::new(|| {})).unwrap();
    pool.submit_job(Box::new(|| {})).unwrap();
    assert_eq!(pool.submit_job(Box::new(|| {})), Err(PoolError::QueueFull));
    assert_eq!(pool.stats().queued_jobs, 2);

    release_tx.send(()).unwrap();
    pool.shutdown();
    assert!(pool.wait_for_termination(WAIT));
    assert_eq!(pool.stats().completed_jobs, 3);
}

#[test]
fn test_graceful_shutdown_runs_queued_jobs() {
    let pool = make_pool(2, 0);
    let probe = ConcurrencyProbe::default();
    for _ in 0..10 {
        pool.submit_job(probe.job(Duration::from_millis(10))).unwrap();
    }

    pool.shutdown();
    pool.shutdown();
    assert!(!pool.is_running());
    assert!(pool.wait_for_termination(WAIT));
    assert_eq!(probe.execution_count.load(Ordering::SeqCst), 10);
    assert_eq!(pool.stats().live_workers, 0);
}

#[test]
fn test_submit_after_shutdown() {
    let pool = make_pool(1, 10);
    pool.shutdown();
    assert_eq!(pool.submit_job(Box::new(|| {})), Err(PoolError::PoolShutdown));
    assert!(!pool.submit(Box::new(|| {})));
    assert!(pool.wait_for_termination(WAIT));
}

#[test]
fn test_wait_for_termination_times_out_while_busy() {
    let pool = make_pool(1, 10);
    let probe = ConcurrencyProbe::default();
    pool.submit_job(probe.job(Duration::from_millis(200))).unwrap();

    pool.shutdown();
    assert!(!pool.wait_for_termination(Some(Duration::from_millis(20))));
    assert!(pool.wait_for_termination(WAIT));
    assert!(pool.is_terminated());
}

#[test]
fn test_pool_backs_scheduler() {
    let pool = Arc::new(make_pool(2, 0));
    let scheduler = Scheduler::new(Arc::clone(&pool) as Arc<dyn Executor>).unwrap();

    let tasks: Vec<_> = (0..10_u64)
        .map(|i| scheduler.post(Duration::from_millis(i * 5), move || Ok(i * i)).unwrap())
        .collect();
    for (i, task) in (0..10_u64).zip(&tasks) {
        assert_eq!(task.value(WAIT), Some(i * i));
    }

    scheduler.shutdown();
    assert!(scheduler.wait_for_termination(WAIT));
    pool.shutdown();
    assert!(pool.wait_for_termination(WAIT));
    assert_eq!(pool.stats().completed_jobs, 10);
}
