//! Benchmarks for the priority queue and the deferred task scheduler.
//!
//! Benchmarks cover:
//! - Queue push/pop under shuffled keys
//! - Targeted removal (the reschedule path)
//! - Posting and cancelling scheduled tasks
//! - End-to-end dispatch through a worker pool

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::seq::SliceRandom;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use prometheus_deferred::config::WorkerPoolConfig;
use prometheus_deferred::core::{Executor, ImmediateExecutor, Scheduler, WorkerPool};
use prometheus_deferred::infra::PriorityBlockingQueue;

// ============================================================================
// Helper Functions
// ============================================================================

fn shuffled_keys(size: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..size).collect();
    keys.shuffle(&mut rand::rng());
    keys
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");

    for size in [100, 1_000, 10_000] {
        let keys = shuffled_keys(size);
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &keys, |b, keys| {
            b.iter(|| {
                let queue = PriorityBlockingQueue::<u64>::min_first();
                for key in keys {
                    queue.push(*key);
                }
                while let Ok(key) = queue.try_pop() {
                    black_box(key);
                }
            });
        });
    }
    group.finish();
}

fn bench_queue_remove_first(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_remove_first");

    for size in [100, 1_000, 5_000] {
        let keys = shuffled_keys(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &keys, |b, keys| {
            let queue = PriorityBlockingQueue::<u64>::min_first();
            for key in keys {
                queue.push(*key);
            }
            let target = size / 2;
            b.iter(|| {
                let removed = queue.remove_first(|key| *key == target);
                if let Some(key) = removed {
                    queue.push(key);
                }
                black_box(removed);
            });
        });
    }
    group.finish();
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_scheduler_post_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_post_cancel");

    for count in [100_u64, 1_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let scheduler = Scheduler::new(Arc::new(ImmediateExecutor)).unwrap();
            b.iter(|| {
                let tasks: Vec<_> = (0..count)
                    .map(|i| scheduler.post(Duration::from_secs(60 + i), move || Ok(i)).unwrap())
                    .collect();
                for task in &tasks {
                    black_box(task.cancel());
                }
            });
            scheduler.shutdown();
            scheduler.wait_for_termination(Some(Duration::from_secs(5)));
        });
    }
    group.finish();
}

fn bench_end_to_end_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end_dispatch");
    let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::new().with_worker_count(4)).unwrap());
    let scheduler = Scheduler::new(Arc::clone(&pool) as Arc<dyn Executor>).unwrap();

    group.bench_function("post_due_and_wait_100", |b| {
        b.iter(|| {
            let tasks: Vec<_> = (0..100_u64)
                .map(|i| scheduler.post(Duration::from_micros(i), move || Ok(i * 2)).unwrap())
                .collect();
            for task in &tasks {
                black_box(task.value(Some(Duration::from_secs(5))));
            }
        });
    });
    group.finish();

    scheduler.shutdown();
    scheduler.wait_for_termination(Some(Duration::from_secs(5)));
    pool.shutdown();
    pool.wait_for_termination(Some(Duration::from_secs(5)));
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(queue_benches, bench_queue_push_pop, bench_queue_remove_first);

criterion_group!(scheduler_benches, bench_scheduler_post_cancel, bench_end_to_end_dispatch);

criterion_main!(queue_benches, scheduler_benches);
