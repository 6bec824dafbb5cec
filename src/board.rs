//! The mutex-arbitrated task board: a fixed-size slot array shared by every producer and
//! the single consumer thread.
//!
//! Grounded directly on the original engine's `Tasks` class: producers write pending
//! requests into the first available slots, the consumer drains pending slots in two
//! phases (snapshot the pending keys under the lock, resolve them against the cache
//! without the lock, write results back under the lock), and producers later collect
//! their own resolved slots and free them for reuse.
//!
//! # Design Philosophy
//!
//! - **Safe slots, not raw pointers**: the original packs `(key ptr, val ptr, pid)` into
//!   a plain array and uses null/sentinel pointers to mean "empty" and "not yet resolved".
//!   Since this whole board lives behind one `parking_lot::Mutex`, there is no atomics
//!   boundary to cross, so [`Slot`] is a plain enum instead — the raw-pointer sentinel
//!   trick is reserved for [`crate::lockless`], where it earns its keep.
//! - **Two-phase drain**: the consumer's O(1) cache splicing must never happen while
//!   holding the board's lock (that would serialize cache promotion behind every
//!   producer's submit/collect), so [`TaskBoard::consumer_drain`] takes the lock twice:
//!   once to snapshot pending keys, once to write results back.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache2q::Cache2Q;

/// A slot's state. Pid `0` in the original source means "empty"; here that's folded into
/// the `Empty` variant so no producer ever has pid `0`.
#[derive(Debug, Clone)]
enum Slot {
    /// Free for any producer to claim.
    Empty,
    /// Claimed by `pid`, carrying `key`, not yet resolved by the consumer.
    Pending { pid: usize, key: Arc<Vec<u8>> },
    /// Resolved by the consumer; `value` is `None` on a cache miss. Waiting for `pid` to
    /// collect it.
    Resolved {
        pid: usize,
        key: Arc<Vec<u8>>,
        value: Option<Arc<Vec<u8>>>,
    },
    /// The exit sentinel. Only ever planted in slot 0, and only once every producer has
    /// stopped submitting.
    Exit,
}

/// Outcome of a single [`TaskBoard::consumer_drain`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The exit sentinel was observed; the consumer thread should stop.
    Exit,
    /// `n` pending requests were resolved and written back (`n` may be zero).
    Count(usize),
}

/// A fixed-size slot array, shared by every producer and the single consumer, behind one
/// `parking_lot::Mutex`.
#[derive(Debug)]
pub struct TaskBoard {
    slots: Mutex<Vec<Slot>>,
}

impl TaskBoard {
    /// Builds a board with `len` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "board length must be non-zero");
        Self {
            slots: Mutex::new(vec![Slot::Empty; len]),
        }
    }

    /// Submits as many of `keys` as there is room for, starting from the first empty
    /// slot and advancing one empty slot at a time (matching the original's contiguous
    /// fill-from-first-gap behavior rather than scanning for every empty slot up front).
    /// Returns how many keys were actually submitted — `0` means the board was full.
    ///
    /// # Panics
    ///
    /// Panics if `pid` is `0` (reserved to mean "no producer").
    pub fn producer_submit(&self, pid: usize, keys: &[Arc<Vec<u8>>]) -> usize {
        assert!(pid != 0, "pid 0 is reserved");
        if keys.is_empty() {
            return 0;
        }

        let mut slots = self.slots.lock();
        let Some(mut index) = slots.iter().position(|s| matches!(s, Slot::Empty)) else {
            return 0;
        };

        let mut submitted = 0;
        for key in keys {
            slots[index] = Slot::Pending {
                pid,
                key: Arc::clone(key),
            };
            submitted += 1;

            match slots[index + 1..].iter().position(|s| matches!(s, Slot::Empty)) {
                Some(offset) => index += 1 + offset,
                None => break,
            }
        }
        submitted
    }

    /// Collects every slot resolved for `pid`, returning `(key, value)` pairs and freeing
    /// those slots back to `Empty`.
    pub fn producer_collect(&self, pid: usize) -> Vec<(Arc<Vec<u8>>, Option<Arc<Vec<u8>>>)> {
        let mut slots = self.slots.lock();
        let mut outputs = Vec::new();
        for slot in slots.iter_mut() {
            if let Slot::Resolved {
                pid: slot_pid,
                key,
                value,
            } = slot
            {
                if *slot_pid == pid {
                    outputs.push((Arc::clone(key), value.clone()));
                    *slot = Slot::Empty;
                }
            }
        }
        outputs
    }

    /// Collects `pid`'s resolved slots first (freeing room), then submits as many of
    /// `keys` as fit. One lock acquisition instead of two.
    ///
    /// # Panics
    ///
    /// Panics if `pid` is `0`.
    pub fn producer_submit_and_collect(
        &self,
        pid: usize,
        keys: &[Arc<Vec<u8>>],
    ) -> (usize, Vec<(Arc<Vec<u8>>, Option<Arc<Vec<u8>>>)>) {
        assert!(pid != 0, "pid 0 is reserved");

        let mut slots = self.slots.lock();

        let mut outputs = Vec::new();
        for slot in slots.iter_mut() {
            if let Slot::Resolved {
                pid: slot_pid,
                key,
                value,
            } = slot
            {
                if *slot_pid == pid {
                    outputs.push((Arc::clone(key), value.clone()));
                    *slot = Slot::Empty;
                }
            }
        }

        let mut submitted = 0;
        if let Some(mut index) = slots.iter().position(|s| matches!(s, Slot::Empty)) {
            for key in keys {
                slots[index] = Slot::Pending {
                    pid,
                    key: Arc::clone(key),
                };
                submitted += 1;

                match slots[index + 1..].iter().position(|s| matches!(s, Slot::Empty)) {
                    Some(offset) => index += 1 + offset,
                    None => break,
                }
            }
        }

        (submitted, outputs)
    }

    /// Plants the exit sentinel in slot 0.
    ///
    /// # Panics
    ///
    /// Panics if slot 0 is not `Empty` — the caller must guarantee every producer has
    /// stopped and every slot has been collected before calling this.
    pub fn plant_exit(&self) {
        let mut slots = self.slots.lock();
        assert!(
            matches!(slots[0], Slot::Empty),
            "slot 0 must be empty before planting the exit sentinel"
        );
        slots[0] = Slot::Exit;
    }

    /// Drains every pending slot against `cache`, in two phases: snapshot pending keys
    /// under the lock, resolve them without the lock (so cache promotion never happens
    /// while the board is locked), then write results back under a second lock
    /// acquisition. When a slot's owning pid is resolved, its index into `pids` (if
    /// supplied) is set so the caller can wake that producer.
    pub fn consumer_drain(&self, cache: &mut Cache2Q, mut pids: Option<&mut [bool]>) -> DrainOutcome {
        struct Pending {
            index: usize,
            pid: usize,
            key: Arc<Vec<u8>>,
        }

        let pending: Vec<Pending> = {
            let slots = self.slots.lock();
            if slots.iter().any(|s| matches!(s, Slot::Exit)) {
                return DrainOutcome::Exit;
            }
            slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| match slot {
                    Slot::Pending { pid, key } => Some(Pending {
                        index,
                        pid: *pid,
                        key: Arc::clone(key),
                    }),
                    _ => None,
                })
                .collect()
        };

        if pending.is_empty() {
            return DrainOutcome::Count(0);
        }

        let resolved: Vec<(usize, usize, Arc<Vec<u8>>, Option<Arc<Vec<u8>>>)> = pending
            .into_iter()
            .map(|p| {
                let value = cache.get(&p.key);
                (p.index, p.pid, p.key, value)
            })
            .collect();

        let count = resolved.len();
        let mut slots = self.slots.lock();
        for (index, pid, key, value) in resolved {
            slots[index] = Slot::Resolved { pid, key, value };
            if let Some(pids) = pids.as_deref_mut() {
                if pid >= 1 {
                    pids[pid - 1] = true;
                }
            }
        }
        DrainOutcome::Count(count)
    }
}
