//! The consumer busy/idle polling loop shared by the "pure" and "signaled" mutex
//! fabrics, and the per-producer flags the signaled variant polls instead of always
//! locking the board.
//!
//! Grounded on the original engine's `ConsumerPure`/`ConsumerSignal` classes: both share
//! one state machine (busy-spin for up to [`crate::config::constants::CHECK_MS`]
//! milliseconds, then fall back to a 1ms idle sleep once no task has shown up for that
//! long, reverting to busy the moment one does) and differ only in how they decide
//! whether it's worth locking the board at all, and in what they do after a successful
//! drain. That variation point is [`ConsumerPolicy`]; [`run_consumer_loop`] is the shared
//! skeleton, replacing the base-class/virtual-function split in the original with a
//! trait parameter.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::board::{DrainOutcome, TaskBoard};
use crate::cache2q::Cache2Q;
use crate::config::constants::{CHECK_MS, CLOCK_SAMPLE_PERIOD, IDLE_SLEEP_MS};

/// Per-producer "I have a pending request" flags, polled by [`SignaledPolicy`] instead of
/// always locking the board to check.
#[derive(Debug)]
pub struct TaskFlags {
    flags: Vec<CachePadded<AtomicBool>>,
}

impl TaskFlags {
    /// Builds `count` flags, all initially clear.
    pub fn new(count: usize) -> Self {
        Self {
            flags: (0..count).map(|_| CachePadded::new(AtomicBool::new(false))).collect(),
        }
    }

    /// Sets producer `pid`'s flag (1-indexed, matching [`crate::board::TaskBoard`]'s pid
    /// convention).
    pub fn set(&self, pid: usize, value: bool) {
        self.flags[pid - 1].store(value, Ordering::Relaxed);
    }

    /// Reads producer `pid`'s flag.
    pub fn get(&self, pid: usize) -> bool {
        self.flags[pid - 1].load(Ordering::Relaxed)
    }

    /// `true` if any producer's flag is set.
    pub fn any_set(&self) -> bool {
        self.flags.iter().any(|f| f.load(Ordering::Relaxed))
    }
}

/// The variation point between the "pure" (always lock and check) and "signaled" (poll
/// flags first) mutex fabrics.
pub trait ConsumerPolicy {
    /// Whether this iteration should attempt to drain the board at all. Pure always
    /// returns `true`; signaled returns `true` only once some producer's flag is set.
    fn should_check(&self) -> bool {
        true
    }

    /// Called once per successfully-drained batch, with one entry per fixed producer
    /// slot set `true` if that producer's request was resolved this drain. Signaled uses
    /// this to clear the flags it polls; pure does nothing.
    fn on_drained(&self, _pids: &[bool]) {}
}

/// Always checks; never reacts to a drain beyond the shared bookkeeping in
/// [`run_consumer_loop`]. Matches `ConsumerPure`.
#[derive(Debug, Default)]
pub struct PurePolicy;

impl ConsumerPolicy for PurePolicy {}

/// Skips the drain entirely while no producer's flag is set, and clears a resolved
/// producer's flag after its request comes back. Matches `ConsumerSignal`.
#[derive(Debug)]
pub struct SignaledPolicy<'a> {
    flags: &'a TaskFlags,
}

impl<'a> SignaledPolicy<'a> {
    /// Builds a policy backed by `flags`, shared with the producers that set them.
    pub fn new(flags: &'a TaskFlags) -> Self {
        Self { flags }
    }
}

impl ConsumerPolicy for SignaledPolicy<'_> {
    fn should_check(&self) -> bool {
        self.flags.any_set()
    }

    fn on_drained(&self, pids: &[bool]) {
        for (i, &resolved) in pids.iter().enumerate() {
            if resolved {
                self.flags.set(i + 1, false);
            }
        }
    }
}

/// Counters accumulated over one consumer loop's lifetime, returned once the exit
/// sentinel is observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerStats {
    /// Iterations where the consumer found no work (whether busy-polling or idle).
    pub wait_try_cnt: u64,
    /// Idle-mode sleeps taken.
    pub sleep_cnt: u64,
    /// Total requests drained over the loop's lifetime.
    pub bench_cnt: u64,
}

/// Runs the shared busy/idle consumer loop against `board` and `cache` until the exit
/// sentinel is observed, using `policy` to decide whether to check the board each
/// iteration and what to do after a successful drain.
///
/// `total_expected` is the number of requests the whole run is expected to produce
/// (`run_producer_num * benchmark_count`): used only to stop counting wait/sleep
/// statistics once the run has clearly finished, matching the original's guard against
/// counting idle time after every producer has already stopped submitting.
pub fn run_consumer_loop(
    board: &TaskBoard,
    cache: &mut Cache2Q,
    policy: &impl ConsumerPolicy,
    total_expected: u64,
) -> ConsumerStats {
    let mut stats = ConsumerStats::default();

    let mut busy_mode = true;
    let mut check_cnt: usize = 0;
    let mut check_start = Instant::now();

    loop {
        let mut pids = vec![false; crate::config::constants::FIX_PRODUCER_NUMBER];

        let consumed = if policy.should_check() {
            match board.consumer_drain(cache, Some(&mut pids)) {
                DrainOutcome::Exit => return stats,
                DrainOutcome::Count(n) => n,
            }
        } else {
            0
        };

        if consumed == 0 {
            let still_running = stats.bench_cnt > 0 && stats.bench_cnt < total_expected;

            if !busy_mode {
                if still_running {
                    stats.sleep_cnt += 1;
                }
                thread::sleep(Duration::from_millis(IDLE_SLEEP_MS));
            } else {
                if check_cnt == 0 {
                    check_start = Instant::now();
                }
                check_cnt += 1;

                if check_cnt % CLOCK_SAMPLE_PERIOD == 0 && check_start.elapsed() >= Duration::from_millis(CHECK_MS) {
                    busy_mode = false;
                }
            }

            if still_running {
                stats.wait_try_cnt += 1;
            }
        } else {
            busy_mode = true;
            check_cnt = 0;
            stats.bench_cnt += consumed as u64;
            policy.on_drained(&pids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cache2QConfig;
    use std::sync::Arc;

    fn small_cache() -> Cache2Q {
        let (cache, _) = Cache2Q::new(
            Cache2QConfig::new(10, 4, 3)
                .with_key_len(2, 8)
                .with_val_len(2, 8),
        );
        cache
    }

    #[test]
    fn task_flags_round_trip() {
        let flags = TaskFlags::new(4);
        assert!(!flags.any_set());
        flags.set(2, true);
        assert!(flags.get(2));
        assert!(flags.any_set());
        flags.set(2, false);
        assert!(!flags.any_set());
    }

    #[test]
    fn pure_policy_always_checks() {
        let policy = PurePolicy;
        assert!(policy.should_check());
        policy.on_drained(&[true, false]);
    }

    #[test]
    fn signaled_policy_tracks_flags() {
        let flags = TaskFlags::new(2);
        let policy = SignaledPolicy::new(&flags);
        assert!(!policy.should_check());
        flags.set(1, true);
        assert!(policy.should_check());
        policy.on_drained(&[true, false]);
        assert!(!flags.get(1));
    }

    #[test]
    fn loop_stops_on_exit_sentinel() {
        let board = TaskBoard::new(8);
        board.plant_exit();
        let mut cache = small_cache();
        let stats = run_consumer_loop(&board, &mut cache, &PurePolicy, 10);
        assert_eq!(stats.bench_cnt, 0);
    }

    #[test]
    fn loop_drains_then_exits() {
        let mut cache = small_cache();
        let board = TaskBoard::new(8);
        let key = Arc::new(b"k".to_vec());
        assert_eq!(board.producer_submit(1, std::slice::from_ref(&key)), 1);

        let outcome = board.consumer_drain(&mut cache, None);
        assert!(matches!(outcome, DrainOutcome::Count(1)));
        board.producer_collect(1);
        board.plant_exit();

        let stats = run_consumer_loop(&board, &mut cache, &PurePolicy, 10);
        assert_eq!(stats.bench_cnt, 0);
    }
}
