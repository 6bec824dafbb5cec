//! Benchmarks comparing the cost of a single cache lookup across the scenarios this crate
//! exists to compare: the unsynchronized engine directly, the single-mutex wrapper, and
//! one round trip through each producer/consumer fabric.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cache2q::board::TaskBoard;
use cache2q::cache2q::{Cache2Q, SharedCache2Q};
use cache2q::config::Cache2QConfig;
use cache2q::lockless::LocklessFabric;

const CACHE_SIZE: usize = 10_000;

fn bench_config() -> Cache2QConfig {
    Cache2QConfig::new(CACHE_SIZE, CACHE_SIZE * 9 / 10, 1_000)
        .with_key_len(8, 32)
        .with_val_len(64, 256)
}

fn bench_unsynchronized_get(c: &mut Criterion) {
    let (mut cache, samples) = Cache2Q::new(bench_config());
    let key = &samples[0];
    c.bench_function("cache2q_get_unsynchronized", |b| {
        b.iter(|| black_box(cache.get(key)))
    });
}

fn bench_shared_get(c: &mut Criterion) {
    let (shared, samples) = SharedCache2Q::new(bench_config());
    let key = &samples[0];
    c.bench_function("cache2q_get_shared_mutex", |b| {
        b.iter(|| black_box(shared.get_owned(key)))
    });
}

fn bench_task_board_round_trip(c: &mut Criterion) {
    let (mut cache, samples) = Cache2Q::new(bench_config());
    let board = TaskBoard::new(64);
    let key = Arc::clone(&samples[0]);

    c.bench_function("cache2q_task_board_submit_drain_collect", |b| {
        b.iter(|| {
            board.producer_submit(1, std::slice::from_ref(&key));
            board.consumer_drain(&mut cache, None);
            black_box(board.producer_collect(1));
        })
    });
}

fn bench_lockless_round_trip(c: &mut Criterion) {
    use cache2q::config::constants::LOCKLESS_ARRAY_NUM;

    let (mut cache, samples) = Cache2Q::new(bench_config());
    let fabric = LocklessFabric::new(1);
    let mut is_processing = [false; LOCKLESS_ARRAY_NUM];

    c.bench_function("cache2q_lockless_fill_scan_drain", |b| {
        b.iter(|| {
            let mut keys = vec![Arc::clone(&samples[0])];
            fabric.ring(0).fill(&mut keys, &mut is_processing);
            fabric.scan_and_resolve(&mut cache);
            black_box(fabric.ring(0).drain_results(&mut is_processing));
        })
    });
}

criterion_group!(
    benches,
    bench_unsynchronized_get,
    bench_shared_get,
    bench_task_board_round_trip,
    bench_lockless_round_trip,
);
criterion_main!(benches);
