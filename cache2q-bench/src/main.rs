//! CLI entry point: builds a [`cache2q::cache2q::Cache2Q`] once per scenario and runs one
//! (or every) producer/consumer fabric against it, printing per-producer QPS, miss
//! percentage, and wait statistics to standard output.
//!
//! Grounded on the original engine's `cmp.cc` driver, which ran all five scenarios back to
//! back and printed one comparison block per scenario; `--scenario` narrows that to a
//! single fabric when the caller only wants one run.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use cache2q::config::{constants, BenchConfig, Cache2QConfig};
use cache2q::metrics::{ConsumerReport, ScenarioReport};

use cache2q_bench::scenario;

/// CLI-only default for `--benchmark-count`, distinct from the library's
/// `constants::BENCHMARK_COUNT` (2^24, the reference benchmark's full workload): a plain
/// `cargo run` with no flags should finish in seconds, not minutes.
const DEFAULT_CLI_BENCHMARK_COUNT: usize = 1 << 16;

/// Which fabric(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// No fabric at all: one thread drives an unsynchronized `Cache2Q` directly.
    Single,
    /// Every producer locks a `SharedCache2Q` directly, no consumer thread.
    Shared,
    /// Mutex task board, consumer always locks to check for work.
    MutexPure,
    /// Mutex task board, consumer polls per-producer flags before locking.
    MutexSignaled,
    /// Lock-free per-producer rings, release/acquire handoff.
    Lockless,
    /// Runs every scenario above, back to back, against independently constructed caches.
    All,
}

/// Compares concurrent access regimes over the same segmented-LRU cache engine.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which fabric(s) to benchmark.
    #[arg(long, value_enum, default_value = "all")]
    scenario: Scenario,

    /// Distinct keys populated into the cache at construction.
    #[arg(long, default_value_t = constants::KEY_SPACE)]
    key_space: usize,

    /// Percentage of `key_space` reserved for the protected segment.
    #[arg(long, default_value_t = constants::PROTECT_PERCENT)]
    protect_percent: usize,

    /// Keys exported from construction as the shared hot-key pool.
    #[arg(long, default_value_t = constants::SAMPLE_SPACE)]
    sample_space: usize,

    /// Producer threads to start.
    #[arg(long, default_value_t = constants::RUN_PRODUCER_NUM)]
    run_producers: usize,

    /// Maximum producer slots the mutex/lockless fabrics are sized for.
    #[arg(long, default_value_t = constants::FIX_PRODUCER_NUMBER)]
    fix_producers: usize,

    /// Lookups each producer issues before stopping.
    #[arg(long, default_value_t = DEFAULT_CLI_BENCHMARK_COUNT)]
    benchmark_count: usize,

    /// Smallest batch size a producer draws per transaction step.
    #[arg(long, default_value_t = constants::TRANSACTION_STEP_LEAST_KEYS)]
    batch_least: usize,

    /// Largest batch size (exclusive) a producer draws per transaction step.
    #[arg(long, default_value_t = constants::TRANSACTION_STEP_MOST_KEYS)]
    batch_most: usize,

    /// Seed for cache construction and every producer's `RandomEngine`.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let protect_cap = args.key_space * args.protect_percent / 100;
    let cache_config = match Cache2QConfig::try_new(args.key_space, protect_cap, args.sample_space) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid cache configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let bench_config = match BenchConfig::try_new(
        args.run_producers,
        args.fix_producers,
        args.benchmark_count,
        args.batch_least,
        args.batch_most,
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid bench configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let scenarios: Vec<Scenario> = match args.scenario {
        Scenario::All => vec![
            Scenario::Single,
            Scenario::Shared,
            Scenario::MutexPure,
            Scenario::MutexSignaled,
            Scenario::Lockless,
        ],
        single => vec![single],
    };

    println!("cache2q benchmark");
    println!("=================");
    println!(
        "key_space={} protect_cap={} sample_space={} run_producers={} benchmark_count={}",
        args.key_space,
        protect_cap,
        args.sample_space,
        bench_config.run_producer_num(),
        bench_config.benchmark_count(),
    );
    println!();

    for scenario in scenarios {
        let report = run_scenario(scenario, cache_config, bench_config, args.seed);
        print_report(&report);
        println!();
    }

    ExitCode::SUCCESS
}

fn run_scenario(
    scenario: Scenario,
    cache_config: Cache2QConfig,
    bench_config: BenchConfig,
    seed: u64,
) -> ScenarioReport {
    match scenario {
        Scenario::Single => scenario::run_single_threaded(cache_config, bench_config, seed),
        Scenario::Shared => scenario::run_shared(cache_config, bench_config, seed),
        Scenario::MutexPure => scenario::run_mutex_pure(cache_config, bench_config, seed),
        Scenario::MutexSignaled => scenario::run_mutex_signaled(cache_config, bench_config, seed),
        Scenario::Lockless => scenario::run_lockless(cache_config, bench_config, seed),
        Scenario::All => unreachable!("All is expanded before dispatch"),
    }
}

fn print_report(report: &ScenarioReport) {
    println!("--- {} ---", report.scenario);
    println!(
        "elapsed={:.2?} total_requests={} total_hits={} total_misses={} aggregate_qps={:.0}",
        report.elapsed,
        report.total_requests(),
        report.total_hits(),
        report.total_misses(),
        report.aggregate_qps(),
    );

    for p in &report.producers {
        println!(
            "  producer {:>2}: requests={:<10} qps={:<12.0} miss%={:<3} wait_retry_cnt={:<8} max_wait_burst={}",
            p.pid,
            p.requests,
            p.qps(),
            p.miss_percent_truncated(),
            p.wait_retry_cnt,
            p.max_wait_burst,
        );
    }

    match report.consumer {
        Some(ConsumerReport::Mutex {
            bench_cnt,
            wait_try_cnt,
            sleep_cnt,
        }) => {
            println!(
                "  consumer: bench_cnt={bench_cnt} wait_try_cnt={wait_try_cnt} sleep_cnt={sleep_cnt}"
            );
        }
        Some(ConsumerReport::Lockless { batch_cnt, wait_cnt }) => {
            println!("  consumer: batch_cnt={batch_cnt} wait_cnt={wait_cnt}");
        }
        None => {}
    }
}
