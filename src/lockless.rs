//! The lock-free per-producer ring fabric.
//!
//! Grounded on the original engine's `LocklessTasks`/`ProducerLockless`/`ConsumerLockless`
//! classes: every producer owns a small, cache-line-padded array of request slots and a
//! matching array of result slots, and hands requests to the single consumer thread by
//! storing a key pointer with release ordering; the consumer acquire-loads it, resolves
//! it against the cache, and hands the answer back the same way. No lock is ever taken.
//!
//! # Design Philosophy
//!
//! - **Thin owned pointers, not lock-based ownership**: both request and result slots are
//!   `AtomicPtr<Vec<u8>>`. A producer's key pointer is borrowed from its own long-lived
//!   hot/random key pools (which outlive every request drawn from them, exactly like the
//!   original's permanent `hot_keys_`/`random_keys_` vectors), so the producer never needs
//!   to track per-slot key liveness. A resolved value pointer is different: it is an
//!   owned `Arc<Vec<u8>>` handed across the atomic boundary via `Arc::into_raw`, and the
//!   producer reclaims that ownership with `Arc::from_raw` when it drains the slot — this
//!   is the one place in the crate where ownership, not just a borrow, crosses a raw
//!   pointer.
//! - **Two static sentinels**: a miss is distinguished from "not yet resolved" by storing
//!   the address of a distinguished static marker rather than any real value, matching the
//!   original's `kNotFound`/`kExitConsumerThreadTask` string-literal addresses used purely
//!   for pointer identity. Neither marker is ever dereferenced as real data.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_utils::CachePadded;

use crate::cache2q::Cache2Q;
use crate::config::constants::{LOCKLESS_ARRAY_NUM, LOCKLESS_CONSUMER_SLEEP_US};

/// Sentinel for "resolved, but the key was not resident" — distinguished from "not yet
/// resolved" (a null pointer) purely by address; its contents are never read.
static NOT_FOUND_MARKER: Vec<u8> = Vec::new();

/// Sentinel planted into producer 0's slot 0 request to tell the consumer to stop.
static EXIT_MARKER: Vec<u8> = Vec::new();

#[inline]
fn not_found_ptr() -> *mut Vec<u8> {
    (&NOT_FOUND_MARKER as *const Vec<u8>).cast_mut()
}

#[inline]
fn exit_ptr() -> *mut Vec<u8> {
    (&EXIT_MARKER as *const Vec<u8>).cast_mut()
}

/// One producer's in-flight request/result slots.
///
/// Request and result arrays are padded to separate cache lines: producers only ever
/// write `request_keys` and only ever read `result_vals`, and the consumer does the
/// opposite, so keeping the two arrays apart avoids false sharing between them.
pub struct PerProducerRing {
    request_keys: CachePadded<[AtomicPtr<Vec<u8>>; LOCKLESS_ARRAY_NUM]>,
    result_vals: CachePadded<[AtomicPtr<Vec<u8>>; LOCKLESS_ARRAY_NUM]>,
}

impl std::fmt::Debug for PerProducerRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerProducerRing")
            .field("width", &LOCKLESS_ARRAY_NUM)
            .finish()
    }
}

impl Default for PerProducerRing {
    fn default() -> Self {
        Self::new()
    }
}

impl PerProducerRing {
    /// Builds a ring with every slot empty.
    pub fn new() -> Self {
        Self {
            request_keys: CachePadded::new(std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut()))),
            result_vals: CachePadded::new(std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut()))),
        }
    }

    fn first_free(is_processing: &[bool; LOCKLESS_ARRAY_NUM], start: usize) -> Option<usize> {
        (start..LOCKLESS_ARRAY_NUM).find(|&i| !is_processing[i])
    }

    /// Fills as many free request slots as there is room for from the front of `keys`,
    /// draining the ones it placed. `is_processing` is the producer's own bookkeeping of
    /// which of its slots are currently awaiting a result. Returns how many were placed.
    ///
    /// The key pointers stored here are borrowed, not owned: callers must only ever pass
    /// keys drawn from a pool that outlives the whole benchmark run (the producer's hot
    /// and random key pools), never a value that could be dropped before the consumer
    /// observes and resolves the request.
    pub fn fill(
        &self,
        keys: &mut Vec<Arc<Vec<u8>>>,
        is_processing: &mut [bool; LOCKLESS_ARRAY_NUM],
    ) -> usize {
        let Some(mut slot) = Self::first_free(is_processing, 0) else {
            return 0;
        };

        let mut placed = 0;
        for key in keys.iter() {
            let key_ptr = Arc::as_ptr(key).cast_mut();
            self.request_keys[slot].store(key_ptr, Ordering::Release);
            is_processing[slot] = true;
            placed += 1;

            match Self::first_free(is_processing, slot + 1) {
                Some(next) => slot = next,
                None => break,
            }
        }
        keys.drain(0..placed);
        placed
    }

    /// Checks every slot this producer still considers in flight for a posted result,
    /// classifying each as a hit or miss and freeing the slot. Returns `(hits, misses)`
    /// resolved this call.
    pub fn drain_results(&self, is_processing: &mut [bool; LOCKLESS_ARRAY_NUM]) -> (usize, usize) {
        let mut hits = 0;
        let mut misses = 0;

        for slot in 0..LOCKLESS_ARRAY_NUM {
            if !is_processing[slot] {
                continue;
            }

            let result = self.result_vals[slot].load(Ordering::Acquire);
            if result.is_null() {
                continue;
            }

            if ptr::eq(result, not_found_ptr()) {
                misses += 1;
            } else {
                hits += 1;
                // SAFETY: the consumer stored this pointer via `Arc::into_raw` on a real
                // cache hit (it is not the `NOT_FOUND_MARKER` address, checked above) and
                // transfers ownership to us at that point; we are the only side that will
                // ever reclaim it, and we do so exactly once per posted result.
                drop(unsafe { Arc::from_raw(result.cast_const()) });
            }

            is_processing[slot] = false;
            self.result_vals[slot].store(ptr::null_mut(), Ordering::Relaxed);
        }

        (hits, misses)
    }
}

/// Outcome of one [`LocklessFabric::scan_and_resolve`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The exit sentinel was observed in producer 0's slot 0; the consumer should stop.
    Exit,
    /// `n` requests were resolved this pass (`n` may be zero).
    Scanned(usize),
}

/// The consumer-side view of every producer's ring.
#[derive(Debug)]
pub struct LocklessFabric {
    rings: Vec<PerProducerRing>,
}

impl LocklessFabric {
    /// Builds a fabric with one ring per running producer.
    ///
    /// # Panics
    ///
    /// Panics if `producer_count` is zero (slot 0 of producer 0 is where the exit
    /// sentinel is planted, so there must be at least one ring).
    pub fn new(producer_count: usize) -> Self {
        assert!(producer_count > 0, "producer_count must be non-zero");
        Self {
            rings: (0..producer_count).map(|_| PerProducerRing::new()).collect(),
        }
    }

    /// Borrows producer `index`'s ring (0-indexed, unlike [`crate::board::TaskBoard`]'s
    /// 1-indexed pid).
    pub fn ring(&self, index: usize) -> &PerProducerRing {
        &self.rings[index]
    }

    /// Plants the exit sentinel in producer 0's slot 0.
    ///
    /// # Panics
    ///
    /// Panics if that slot is not currently empty — the caller must guarantee every
    /// producer has stopped submitting before calling this.
    pub fn plant_exit(&self) {
        let prior = self.rings[0].request_keys[0].compare_exchange(
            ptr::null_mut(),
            exit_ptr(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
        assert!(
            prior.is_ok(),
            "slot 0 of producer 0 must be empty before planting the exit sentinel"
        );
    }

    /// Scans every ring for pending requests, resolving each against `cache` and posting
    /// the result back. Checks the exit sentinel first.
    pub fn scan_and_resolve(&self, cache: &mut Cache2Q) -> ScanOutcome {
        if ptr::eq(
            self.rings[0].request_keys[0].load(Ordering::Relaxed),
            exit_ptr(),
        ) {
            return ScanOutcome::Exit;
        }

        let mut resolved = 0;
        for ring in &self.rings {
            for slot in 0..LOCKLESS_ARRAY_NUM {
                let key_ptr = ring.request_keys[slot].load(Ordering::Acquire);
                if key_ptr.is_null() {
                    continue;
                }
                ring.request_keys[slot].store(ptr::null_mut(), Ordering::Relaxed);

                // SAFETY: the producer published this pointer with a release store and
                // guarantees the pointee (one of its pool entries) outlives the whole
                // benchmark run; we have exclusive read access to it as the only consumer
                // thread, and we never write through it.
                let key: &[u8] = unsafe { &*key_ptr };
                let result_ptr = match cache.get(key) {
                    Some(value) => Arc::into_raw(value).cast_mut(),
                    None => not_found_ptr(),
                };
                ring.result_vals[slot].store(result_ptr, Ordering::Release);
                resolved += 1;
            }
        }

        ScanOutcome::Scanned(resolved)
    }
}

/// Counters accumulated over one lockless consumer loop's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocklessConsumerStats {
    /// Total requests resolved over the loop's lifetime.
    pub batch_cnt: u64,
    /// Iterations that found no pending request while the run was still in progress.
    pub wait_cnt: u64,
}

/// Runs the lock-free consumer loop against `fabric` and `cache` until the exit sentinel
/// is observed. Sleeps [`LOCKLESS_CONSUMER_SLEEP_US`] whenever nothing has happened yet
/// or the whole run's expected request count has already been reached; otherwise busy
/// scans, counting empty scans as `wait_cnt`.
pub fn run_consumer_loop(fabric: &LocklessFabric, cache: &mut Cache2Q, total_expected: u64) -> LocklessConsumerStats {
    let mut stats = LocklessConsumerStats::default();

    loop {
        let n = match fabric.scan_and_resolve(cache) {
            ScanOutcome::Exit => return stats,
            ScanOutcome::Scanned(n) => n,
        };

        if n != 0 {
            stats.batch_cnt += n as u64;
        }

        if stats.batch_cnt == 0 || stats.batch_cnt >= total_expected {
            thread::sleep(Duration::from_micros(LOCKLESS_CONSUMER_SLEEP_US));
        } else if n == 0 {
            stats.wait_cnt += 1;
        }
    }
}
