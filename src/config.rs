//! Tuning constants and validated configuration for the 2Q cache and the benchmark fabrics.
//!
//! # Design Philosophy
//!
//! Same shape as the rest of the crate's config types: private fields, a validating
//! `new()`, and plain accessors. Defaults reproduce the spec's compile-time constants
//! table so a caller who wants the reference benchmark gets it via `Default::default()`.

/// Compile-time tuning constants, named after their spec counterparts.
pub mod constants {
    /// Minimum key length in bytes.
    pub const KEY_MIN_LEN: usize = 2;
    /// Maximum key length in bytes (exclusive upper bound).
    pub const KEY_MAX_LEN: usize = 64;
    /// Minimum value length in bytes.
    pub const VAL_MIN_LEN: usize = 20;
    /// Maximum value length in bytes (exclusive upper bound).
    pub const VAL_MAX_LEN: usize = 2000;

    /// Target distinct keys in the cache.
    pub const KEY_SPACE: usize = 1 << 20;
    /// Hot-key pool size for the single-threaded scenario.
    pub const HOT_SPACE: usize = 1 << 10;
    /// Random-key pool size for the single-threaded scenario.
    pub const RAND_SPACE: usize = 1 << 12;
    /// Samples exported from cache construction, shared by all producers as `hot_keys`.
    pub const SAMPLE_SPACE: usize = 1 << 12;

    /// Percentage of `KEY_SPACE` reserved for the protected segment.
    pub const PROTECT_PERCENT: usize = 90;
    /// Hot/cold split for the producer key dice: draws below this hit the hot pool.
    pub const HOT_HIT: i32 = 90;

    /// Lookups each producer issues before stopping.
    pub const BENCHMARK_COUNT: usize = 1 << 24;

    /// Mutex task-board length.
    pub const TASK_LEN: usize = 64;
    /// Maximum configured producer threads.
    pub const FIX_PRODUCER_NUMBER: usize = 8;
    /// Producer threads actually started in a run.
    pub const RUN_PRODUCER_NUM: usize = 2;

    /// Smallest batch size a producer draws per transaction step.
    pub const TRANSACTION_STEP_LEAST_KEYS: usize = 1;
    /// Largest batch size (exclusive upper bound) a producer draws per transaction step.
    pub const TRANSACTION_STEP_MOST_KEYS: usize = 20;

    /// Consumer busy→idle transition threshold.
    pub const CHECK_MS: u64 = 100;
    /// Iterations between clock samples while busy-polling.
    pub const CLOCK_SAMPLE_PERIOD: usize = 1 << 10;
    /// Idle-mode sleep between polls.
    pub const IDLE_SLEEP_MS: u64 = 1;
    /// Producer retry sleep on a full mutex board.
    pub const PRODUCER_RETRY_SLEEP_US: u64 = 1;
    /// Lockless consumer sleep once quiescent or not yet started.
    pub const LOCKLESS_CONSUMER_SLEEP_US: u64 = 100;
    /// Per-producer lock-free ring width: in-flight request/result slots per producer.
    pub const LOCKLESS_ARRAY_NUM: usize = 8;
}

use constants::*;

use crate::error::BenchError;

/// Validated configuration for constructing a [`crate::cache2q::Cache2Q`].
#[derive(Debug, Clone, Copy)]
pub struct Cache2QConfig {
    init_keys: usize,
    protect_cap: usize,
    sample_count: usize,
    key_min_len: usize,
    key_max_len: usize,
    val_min_len: usize,
    val_max_len: usize,
}

impl Cache2QConfig {
    /// Creates a configuration with the spec's default key/value length bounds.
    ///
    /// # Panics
    ///
    /// Panics if `protect_cap` or `sample_count` exceed `init_keys`, or if `init_keys`
    /// is zero.
    pub fn new(init_keys: usize, protect_cap: usize, sample_count: usize) -> Self {
        assert!(init_keys > 0, "init_keys must be non-zero");
        assert!(
            protect_cap <= init_keys,
            "protect_cap must be <= init_keys"
        );
        assert!(
            sample_count <= init_keys,
            "sample_count must be <= init_keys"
        );

        Self {
            init_keys,
            protect_cap,
            sample_count,
            key_min_len: KEY_MIN_LEN,
            key_max_len: KEY_MAX_LEN,
            val_min_len: VAL_MIN_LEN,
            val_max_len: VAL_MAX_LEN,
        }
    }

    /// Fallible counterpart to [`Cache2QConfig::new`] for callers (e.g. the CLI) taking
    /// construction parameters from outside the process, where a bad value should be
    /// reported rather than panicking the whole run.
    pub fn try_new(
        init_keys: usize,
        protect_cap: usize,
        sample_count: usize,
    ) -> Result<Self, BenchError> {
        if init_keys == 0 {
            return Err(BenchError::InvalidConfig(
                "init_keys must be non-zero".to_string(),
            ));
        }
        if protect_cap > init_keys {
            return Err(BenchError::InvalidConfig(
                "protect_cap must be <= init_keys".to_string(),
            ));
        }
        if sample_count > init_keys {
            return Err(BenchError::InvalidConfig(
                "sample_count must be <= init_keys".to_string(),
            ));
        }
        Ok(Self::new(init_keys, protect_cap, sample_count))
    }

    /// Overrides the key length bounds (half-open `[min, max)`).
    ///
    /// # Panics
    ///
    /// Panics if `min >= max`.
    pub fn with_key_len(mut self, min: usize, max: usize) -> Self {
        assert!(min < max, "key length bounds must be non-empty");
        self.key_min_len = min;
        self.key_max_len = max;
        self
    }

    /// Overrides the value length bounds (half-open `[min, max)`).
    ///
    /// # Panics
    ///
    /// Panics if `min >= max`.
    pub fn with_val_len(mut self, min: usize, max: usize) -> Self {
        assert!(min < max, "value length bounds must be non-empty");
        self.val_min_len = min;
        self.val_max_len = max;
        self
    }

    /// Number of distinct (key, value) pairs requested at construction.
    pub fn init_keys(&self) -> usize {
        self.init_keys
    }

    /// Protected segment capacity.
    pub fn protect_cap(&self) -> usize {
        self.protect_cap
    }

    /// Number of generated keys to export as shared samples.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Key length bounds, half-open.
    pub fn key_len_bounds(&self) -> (usize, usize) {
        (self.key_min_len, self.key_max_len)
    }

    /// Value length bounds, half-open.
    pub fn val_len_bounds(&self) -> (usize, usize) {
        (self.val_min_len, self.val_max_len)
    }
}

impl Default for Cache2QConfig {
    /// The spec's default sizing: `KEY_SPACE` keys, 90% protected, `SAMPLE_SPACE` samples.
    fn default() -> Self {
        let protect_cap = KEY_SPACE * PROTECT_PERCENT / 100;
        Self::new(KEY_SPACE, protect_cap, SAMPLE_SPACE)
    }
}

/// Validated configuration for a producer/consumer benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct BenchConfig {
    run_producer_num: usize,
    fix_producer_number: usize,
    benchmark_count: usize,
    batch_least_keys: usize,
    batch_most_keys: usize,
}

impl BenchConfig {
    /// Creates a new bench configuration.
    ///
    /// # Panics
    ///
    /// Panics if `run_producer_num` is zero or exceeds `fix_producer_number`, or if the
    /// batch bounds are not `1 <= least <= most`.
    pub fn new(
        run_producer_num: usize,
        fix_producer_number: usize,
        benchmark_count: usize,
        batch_least_keys: usize,
        batch_most_keys: usize,
    ) -> Self {
        assert!(
            run_producer_num > 0 && run_producer_num <= fix_producer_number,
            "run_producer_num must be in [1, fix_producer_number]"
        );
        assert!(
            batch_least_keys >= 1 && batch_least_keys <= batch_most_keys,
            "batch bounds must satisfy 1 <= least <= most"
        );

        Self {
            run_producer_num,
            fix_producer_number,
            benchmark_count,
            batch_least_keys,
            batch_most_keys,
        }
    }

    /// Fallible counterpart to [`BenchConfig::new`], for CLI-supplied parameters.
    pub fn try_new(
        run_producer_num: usize,
        fix_producer_number: usize,
        benchmark_count: usize,
        batch_least_keys: usize,
        batch_most_keys: usize,
    ) -> Result<Self, BenchError> {
        if run_producer_num == 0 || run_producer_num > fix_producer_number {
            return Err(BenchError::InvalidConfig(
                "run_producer_num must be in [1, fix_producer_number]".to_string(),
            ));
        }
        if batch_least_keys < 1 || batch_least_keys > batch_most_keys {
            return Err(BenchError::InvalidConfig(
                "batch bounds must satisfy 1 <= least <= most".to_string(),
            ));
        }
        Ok(Self::new(
            run_producer_num,
            fix_producer_number,
            benchmark_count,
            batch_least_keys,
            batch_most_keys,
        ))
    }

    /// Number of producer threads to start this run.
    pub fn run_producer_num(&self) -> usize {
        self.run_producer_num
    }

    /// Maximum number of producer slots the fabrics were sized for.
    pub fn fix_producer_number(&self) -> usize {
        self.fix_producer_number
    }

    /// Lookups each producer issues before stopping.
    pub fn benchmark_count(&self) -> usize {
        self.benchmark_count
    }

    /// Batch size bounds a producer draws from, half-open `[least, most+1)`.
    pub fn batch_key_bounds(&self) -> (usize, usize) {
        (self.batch_least_keys, self.batch_most_keys)
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(
            RUN_PRODUCER_NUM,
            FIX_PRODUCER_NUMBER,
            BENCHMARK_COUNT,
            TRANSACTION_STEP_LEAST_KEYS,
            TRANSACTION_STEP_MOST_KEYS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_config_matches_spec_table() {
        let config = Cache2QConfig::default();
        assert_eq!(config.init_keys(), KEY_SPACE);
        assert_eq!(config.protect_cap(), KEY_SPACE * 9 / 10);
        assert_eq!(config.sample_count(), SAMPLE_SPACE);
        assert_eq!(config.key_len_bounds(), (2, 64));
        assert_eq!(config.val_len_bounds(), (20, 2000));
    }

    #[test]
    #[should_panic(expected = "protect_cap must be <= init_keys")]
    fn rejects_protect_cap_over_init_keys() {
        Cache2QConfig::new(10, 11, 0);
    }

    #[test]
    #[should_panic(expected = "sample_count must be <= init_keys")]
    fn rejects_sample_count_over_init_keys() {
        Cache2QConfig::new(10, 5, 11);
    }

    #[test]
    fn default_bench_config_matches_spec_table() {
        let config = BenchConfig::default();
        assert_eq!(config.run_producer_num(), 2);
        assert_eq!(config.fix_producer_number(), 8);
        assert_eq!(config.benchmark_count(), 1 << 24);
        assert_eq!(config.batch_key_bounds(), (1, 20));
    }

    #[test]
    #[should_panic(expected = "run_producer_num must be in")]
    fn rejects_run_producer_num_over_fix_number() {
        BenchConfig::new(9, 8, 100, 1, 20);
    }

    #[test]
    #[should_panic(expected = "batch bounds must satisfy")]
    fn rejects_inverted_batch_bounds() {
        BenchConfig::new(2, 8, 100, 20, 1);
    }

    #[test]
    fn try_new_reports_invalid_cache_config_without_panicking() {
        let err = Cache2QConfig::try_new(10, 11, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: protect_cap must be <= init_keys"
        );
    }

    #[test]
    fn try_new_accepts_valid_cache_config() {
        assert!(Cache2QConfig::try_new(10, 4, 3).is_ok());
    }

    #[test]
    fn try_new_reports_invalid_bench_config_without_panicking() {
        let err = BenchConfig::try_new(9, 8, 100, 1, 20).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: run_producer_num must be in [1, fix_producer_number]"
        );
    }
}
