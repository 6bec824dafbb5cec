//! The producer driver shared by every scenario: draws a 90/10 hot/cold batch of keys and
//! hands it to whichever fabric the running scenario uses.
//!
//! Grounded on the original engine's `Producer` base class and its `pc_pure.cc` /
//! `pc_signal.cc` / `pc_lockless.cc` `batch_keys` overrides: the batch-drawing logic (draw
//! size, then per-key hot/cold dice) is identical across every fabric, so it lives here
//! once; only the "how do I hand this batch off" step below differs per fabric, matching
//! the original's override point.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cache2q::board::TaskBoard;
use cache2q::cache2q::{Cache2Q, SharedCache2Q};
use cache2q::config::constants::{
    HOT_HIT, LOCKLESS_ARRAY_NUM, PRODUCER_RETRY_SLEEP_US,
};
use cache2q::lockless::PerProducerRing;
use cache2q::random::RandomEngine;

/// A producer's seeded key pools and running counters, carried across every batch it
/// issues in one scenario run.
#[derive(Debug)]
pub struct ProducerState {
    /// This producer's id, 1-indexed (matches [`TaskBoard`]'s pid convention).
    pub pid: usize,
    engine: RandomEngine,
    hot_keys: Vec<Arc<Vec<u8>>>,
    random_keys: Vec<Arc<Vec<u8>>>,
    /// Lookups resolved to a resident key so far.
    pub hits: u64,
    /// Lookups resolved to a miss so far.
    pub misses: u64,
    /// Times this producer found its outbound channel full/empty and had to retry.
    pub wait_retry_cnt: u64,
    /// Longest run of consecutive wait-retries seen in one fill/drain round.
    pub max_wait_burst: u64,
}

impl ProducerState {
    /// Builds a producer's state: a fresh `RandomEngine` seeded from `seed + pid` (matching
    /// the original's per-pid engine seeding), the shared `hot_keys` sample pool, and a
    /// freshly generated `random_keys` pool of equal cardinality.
    pub fn new(
        pid: usize,
        seed: u64,
        hot_keys: Vec<Arc<Vec<u8>>>,
        key_len_bounds: (usize, usize),
    ) -> Self {
        let mut engine = RandomEngine::new(seed.wrapping_add(pid as u64));
        let (key_min, key_max) = key_len_bounds;
        let random_keys = (0..hot_keys.len())
            .map(|_| Arc::new(engine.rand_str_scope(key_min, key_max)))
            .collect();

        Self {
            pid,
            engine,
            hot_keys,
            random_keys,
            hits: 0,
            misses: 0,
            wait_retry_cnt: 0,
            max_wait_burst: 0,
        }
    }

    /// Draws a batch of `[batch_least, batch_most]` key references, each chosen 90% from
    /// `hot_keys` and 10% from `random_keys` (the `random_keys` pool almost never hits the
    /// cache, since it was generated independently of construction — that 10% share is
    /// where most misses come from).
    ///
    /// # Panics
    ///
    /// Panics if both pools are empty (there is nothing to draw from — a configuration
    /// bug, not a runtime condition: see SPEC_FULL §8 boundary behavior 8).
    pub fn draw_batch(&mut self, batch_least: usize, batch_most: usize) -> Vec<Arc<Vec<u8>>> {
        assert!(
            !self.hot_keys.is_empty() || !self.random_keys.is_empty(),
            "producer has no keys to draw from"
        );
        let size = self.engine.rand_size_scope(batch_least, batch_most + 1);
        (0..size)
            .map(|_| {
                let dice = self.engine.rand_int_scope(0, 100);
                if dice < HOT_HIT && !self.hot_keys.is_empty() {
                    let idx = self.engine.rand_size_scope(0, self.hot_keys.len());
                    Arc::clone(&self.hot_keys[idx])
                } else {
                    let idx = self.engine.rand_size_scope(0, self.random_keys.len());
                    Arc::clone(&self.random_keys[idx])
                }
            })
            .collect()
    }

    fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Resolves `keys` directly against a consumer-owned `Cache2Q`. Used by the single-threaded
/// scenario, where there is no separate consumer thread at all.
pub fn batch_single_threaded(cache: &mut Cache2Q, state: &mut ProducerState, keys: &[Arc<Vec<u8>>]) {
    for key in keys {
        let hit = cache.get(key).is_some();
        state.record(hit);
    }
}

/// Resolves `keys` by locking `cache` once per batch. Used by the shared-lock scenario,
/// where every thread calls `SharedCache2Q` directly — no producer/consumer split.
pub fn batch_shared(cache: &SharedCache2Q, state: &mut ProducerState, keys: &[Arc<Vec<u8>>]) {
    let refs: Vec<&[u8]> = keys.iter().map(|k| &k[..]).collect();
    for result in cache.get_batch(&refs) {
        state.record(result.is_some());
    }
}

/// Hands `keys` to a [`TaskBoard`], looping submit+collect until every key in the batch has
/// been both submitted and its result collected. `flags` is `Some` for the signaled
/// variant (set before submitting, cleared once the board reports nothing moved) and
/// `None` for pure (which never touches flags).
///
/// Matches the original's "set flag before submit succeeds" sequencing exactly, including
/// its documented benign race (SPEC_FULL §9): the flag may briefly read `true` with no
/// slot actually owned by this pid.
pub fn batch_mutex_board(
    board: &TaskBoard,
    flags: Option<&cache2q::consumer::TaskFlags>,
    state: &mut ProducerState,
    mut keys: Vec<Arc<Vec<u8>>>,
) {
    let mut outstanding = 0usize;
    let mut burst = 0u64;

    while !keys.is_empty() || outstanding > 0 {
        if let Some(f) = flags {
            f.set(state.pid, true);
        }

        let (submitted, collected) = board.producer_submit_and_collect(state.pid, &keys);
        keys.drain(0..submitted);
        outstanding += submitted;

        for (_, value) in &collected {
            state.record(value.is_some());
        }
        outstanding -= collected.len();

        if submitted == 0 && collected.is_empty() {
            state.wait_retry_cnt += 1;
            burst += 1;
            state.max_wait_burst = state.max_wait_burst.max(burst);
            if let Some(f) = flags {
                f.set(state.pid, false);
            }
            thread::sleep(Duration::from_micros(PRODUCER_RETRY_SLEEP_US));
        } else {
            burst = 0;
        }
    }

    if let Some(f) = flags {
        f.set(state.pid, false);
    }
}

/// Hands `keys` to a [`PerProducerRing`], looping fill+drain (SPEC_FULL §4.5) until every
/// key in the batch has resolved.
///
/// # Panics (debug only)
///
/// Debug-asserts the ring's request slots are all clear on entry, matching the original's
/// `batch_keys` precondition that the previous batch finished cleanly.
pub fn batch_lockless(ring: &PerProducerRing, state: &mut ProducerState, mut keys: Vec<Arc<Vec<u8>>>) {
    let total = keys.len();
    let mut is_processing = [false; LOCKLESS_ARRAY_NUM];
    let mut fill_burst = 0u64;
    let mut drain_burst = 0u64;
    let mut resolved = 0usize;

    while resolved < total {
        let had_more_to_fill = !keys.is_empty();
        let placed = ring.fill(&mut keys, &mut is_processing);
        if had_more_to_fill && placed == 0 {
            state.wait_retry_cnt += 1;
            fill_burst += 1;
            state.max_wait_burst = state.max_wait_burst.max(fill_burst);
        } else {
            fill_burst = 0;
        }

        let (hits, misses) = ring.drain_results(&mut is_processing);
        if hits + misses == 0 {
            state.wait_retry_cnt += 1;
            drain_burst += 1;
            state.max_wait_burst = state.max_wait_burst.max(drain_burst);
        } else {
            drain_burst = 0;
        }

        state.hits += hits as u64;
        state.misses += misses as u64;
        resolved += hits + misses;
    }
}
