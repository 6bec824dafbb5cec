//! One runner function per benchmark scenario, each producing a uniform
//! [`cache2q::metrics::ScenarioReport`].
//!
//! Grounded on the original engine's five `cmp.cc` benchmark drivers (`bench_single`,
//! `bench_shared`, `bench_mutex_pure`, `bench_mutex_signal`, `bench_lockless`): each spawns
//! its producer threads plus (where the fabric has one) a consumer thread, waits for every
//! producer to reach its configured request count, signals the consumer to stop, and joins
//! everything before handing back counters. The thread choreography differs only in how
//! producers and consumer talk to each other — the surrounding spawn/join/report shape is
//! identical, mirrored here as five sibling functions rather than one generalized driver,
//! matching the original's one-driver-per-fabric layout.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use cache2q::board::TaskBoard;
use cache2q::cache2q::{Cache2Q, SharedCache2Q};
use cache2q::config::{BenchConfig, Cache2QConfig};
use cache2q::consumer::{self, ConsumerStats, PurePolicy, SignaledPolicy, TaskFlags};
use cache2q::lockless::{self, LocklessConsumerStats, LocklessFabric};
use cache2q::metrics::{ConsumerReport, ProducerReport, ScenarioReport};

use crate::producer::{batch_lockless, batch_mutex_board, batch_shared, batch_single_threaded, ProducerState};

fn drive_producer<F>(
    pid: usize,
    seed: u64,
    hot_keys: Vec<Arc<Vec<u8>>>,
    key_len_bounds: (usize, usize),
    bench: BenchConfig,
    mut issue_batch: F,
) -> ProducerReport
where
    F: FnMut(&mut ProducerState, Vec<Arc<Vec<u8>>>),
{
    let mut state = ProducerState::new(pid, seed, hot_keys, key_len_bounds);
    let (least, most) = bench.batch_key_bounds();
    let start = Instant::now();

    let mut issued = 0usize;
    while issued < bench.benchmark_count() {
        let batch = state.draw_batch(least, most);
        issued += batch.len();
        issue_batch(&mut state, batch);
    }

    ProducerReport {
        pid: state.pid,
        requests: state.hits + state.misses,
        hits: state.hits,
        misses: state.misses,
        elapsed: start.elapsed(),
        wait_retry_cnt: state.wait_retry_cnt,
        max_wait_burst: state.max_wait_burst,
    }
}

/// Runs every configured producer against one unsynchronized `Cache2Q`, on the calling
/// thread — there is no separate consumer and nothing to spawn at all.
pub fn run_single_threaded(cache_config: Cache2QConfig, bench: BenchConfig, seed: u64) -> ScenarioReport {
    let (mut cache, samples) = Cache2Q::new(cache_config);
    let key_len_bounds = cache_config.key_len_bounds();
    let start = Instant::now();

    let producers = (1..=bench.run_producer_num())
        .map(|pid| {
            drive_producer(pid, seed, samples.clone(), key_len_bounds, bench, |state, batch| {
                batch_single_threaded(&mut cache, state, &batch)
            })
        })
        .collect();

    ScenarioReport {
        scenario: "single-threaded".to_string(),
        elapsed: start.elapsed(),
        producers,
        consumer: None,
    }
}

/// Runs every configured producer against one `SharedCache2Q`, each on its own thread,
/// locking the cache directly for every batch. No consumer thread: every producer is its
/// own caller.
pub fn run_shared(cache_config: Cache2QConfig, bench: BenchConfig, seed: u64) -> ScenarioReport {
    let (shared, samples) = SharedCache2Q::new(cache_config);
    let key_len_bounds = cache_config.key_len_bounds();
    let start = Instant::now();

    let producers = thread::scope(|scope| {
        let handles: Vec<_> = (1..=bench.run_producer_num())
            .map(|pid| {
                let shared = &shared;
                let samples = samples.clone();
                scope.spawn(move || {
                    drive_producer(pid, seed, samples, key_len_bounds, bench, |state, batch| {
                        batch_shared(shared, state, &batch)
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("producer thread panicked")).collect()
    });

    ScenarioReport {
        scenario: "shared-lock".to_string(),
        elapsed: start.elapsed(),
        producers,
        consumer: None,
    }
}

fn run_mutex_board(name: &str, signaled: bool, cache_config: Cache2QConfig, bench: BenchConfig, seed: u64) -> ScenarioReport {
    let (mut cache, samples) = Cache2Q::new(cache_config);
    let key_len_bounds = cache_config.key_len_bounds();
    let board = TaskBoard::new(cache2q::config::constants::TASK_LEN);
    let flags = TaskFlags::new(bench.fix_producer_number());
    let total_expected = (bench.run_producer_num() * bench.benchmark_count()) as u64;

    let start = Instant::now();

    let (producers, consumer_stats) = thread::scope(|scope| {
        let consumer_handle = {
            let board = &board;
            let flags = &flags;
            let cache = &mut cache;
            scope.spawn(move || {
                if signaled {
                    let policy = SignaledPolicy::new(flags);
                    consumer::run_consumer_loop(board, cache, &policy, total_expected)
                } else {
                    consumer::run_consumer_loop(board, cache, &PurePolicy, total_expected)
                }
            })
        };

        let producer_handles: Vec<_> = (1..=bench.run_producer_num())
            .map(|pid| {
                let board = &board;
                let flags = &flags;
                let samples = samples.clone();
                scope.spawn(move || {
                    let flags_ref = signaled.then_some(flags);
                    drive_producer(pid, seed, samples, key_len_bounds, bench, |state, batch| {
                        batch_mutex_board(board, flags_ref, state, batch)
                    })
                })
            })
            .collect();

        let producers: Vec<ProducerReport> = producer_handles
            .into_iter()
            .map(|h| h.join().expect("producer thread panicked"))
            .collect();

        if signaled {
            // The signaled consumer only calls `consumer_drain` once some flag is set
            // (SPEC_FULL.md §4.4); every producer clears its own flag on its way out, so
            // nothing would ever wake the consumer to observe the exit sentinel without
            // this.
            flags.set(1, true);
        }
        board.plant_exit();
        let consumer_stats = consumer_handle.join().expect("consumer thread panicked");
        (producers, consumer_stats)
    });

    ScenarioReport {
        scenario: name.to_string(),
        elapsed: start.elapsed(),
        producers,
        consumer: Some(consumer_report_from(consumer_stats)),
    }
}

fn consumer_report_from(stats: ConsumerStats) -> ConsumerReport {
    ConsumerReport::Mutex {
        bench_cnt: stats.bench_cnt,
        wait_try_cnt: stats.wait_try_cnt,
        sleep_cnt: stats.sleep_cnt,
    }
}

/// Runs the mutex task-board scenario where the consumer always locks the board to check
/// for work, regardless of whether any producer has anything pending.
pub fn run_mutex_pure(cache_config: Cache2QConfig, bench: BenchConfig, seed: u64) -> ScenarioReport {
    run_mutex_board("mutex-pure", false, cache_config, bench, seed)
}

/// Runs the mutex task-board scenario where the consumer polls per-producer atomic flags
/// before locking the board, skipping the lock entirely while nothing is pending.
pub fn run_mutex_signaled(cache_config: Cache2QConfig, bench: BenchConfig, seed: u64) -> ScenarioReport {
    run_mutex_board("mutex-signaled", true, cache_config, bench, seed)
}

/// Runs the lock-free per-producer ring scenario: every producer owns a dedicated ring,
/// and the consumer scans every ring's slots without ever taking a lock.
pub fn run_lockless(cache_config: Cache2QConfig, bench: BenchConfig, seed: u64) -> ScenarioReport {
    let (mut cache, samples) = Cache2Q::new(cache_config);
    let key_len_bounds = cache_config.key_len_bounds();
    let fabric = LocklessFabric::new(bench.run_producer_num());
    let total_expected = (bench.run_producer_num() * bench.benchmark_count()) as u64;

    let start = Instant::now();

    let (producers, consumer_stats): (Vec<ProducerReport>, LocklessConsumerStats) = thread::scope(|scope| {
        let consumer_handle = {
            let fabric = &fabric;
            let cache = &mut cache;
            scope.spawn(move || lockless::run_consumer_loop(fabric, cache, total_expected))
        };

        let producer_handles: Vec<_> = (1..=bench.run_producer_num())
            .map(|pid| {
                let fabric = &fabric;
                let samples = samples.clone();
                scope.spawn(move || {
                    let ring = fabric.ring(pid - 1);
                    drive_producer(pid, seed, samples, key_len_bounds, bench, |state, batch| {
                        batch_lockless(ring, state, batch)
                    })
                })
            })
            .collect();

        let producers = producer_handles
            .into_iter()
            .map(|h| h.join().expect("producer thread panicked"))
            .collect();

        fabric.plant_exit();
        let consumer_stats = consumer_handle.join().expect("consumer thread panicked");
        (producers, consumer_stats)
    });

    ScenarioReport {
        scenario: "lockless".to_string(),
        elapsed: start.elapsed(),
        producers,
        consumer: Some(ConsumerReport::Lockless {
            batch_cnt: consumer_stats.batch_cnt,
            wait_cnt: consumer_stats.wait_cnt,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_cache_config() -> Cache2QConfig {
        Cache2QConfig::new(64, 32, 16).with_key_len(2, 8).with_val_len(2, 8)
    }

    fn tiny_bench_config(run_producers: usize) -> BenchConfig {
        BenchConfig::new(run_producers, 8, 200, 1, 5)
    }

    #[test]
    fn single_threaded_scenario_resolves_every_request() {
        let report = run_single_threaded(tiny_cache_config(), tiny_bench_config(1), 1);
        assert_eq!(report.producers.len(), 1);
        assert!(report.total_requests() >= 200);
        assert!(report.consumer.is_none());
    }

    #[test]
    fn shared_scenario_resolves_every_request_across_producers() {
        let report = run_shared(tiny_cache_config(), tiny_bench_config(2), 1);
        assert_eq!(report.producers.len(), 2);
        assert!(report.total_requests() >= 400);
    }

    #[test]
    fn mutex_pure_scenario_reports_consumer_counters() {
        let report = run_mutex_pure(tiny_cache_config(), tiny_bench_config(2), 1);
        assert_eq!(report.producers.len(), 2);
        assert!(matches!(report.consumer, Some(ConsumerReport::Mutex { .. })));
        if let Some(ConsumerReport::Mutex { bench_cnt, .. }) = report.consumer {
            assert_eq!(bench_cnt, report.total_requests());
        }
    }

    #[test]
    fn mutex_signaled_scenario_reports_consumer_counters() {
        let report = run_mutex_signaled(tiny_cache_config(), tiny_bench_config(2), 1);
        assert_eq!(report.producers.len(), 2);
        assert!(matches!(report.consumer, Some(ConsumerReport::Mutex { .. })));
    }

    #[test]
    fn lockless_scenario_reports_consumer_counters() {
        let report = run_lockless(tiny_cache_config(), tiny_bench_config(2), 1);
        assert_eq!(report.producers.len(), 2);
        assert!(matches!(report.consumer, Some(ConsumerReport::Lockless { .. })));
        if let Some(ConsumerReport::Lockless { batch_cnt, .. }) = report.consumer {
            assert_eq!(batch_cnt, report.total_requests());
        }
    }
}
