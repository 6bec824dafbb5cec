//! Deterministic, per-thread random generation.
//!
//! Every producer and the construction path of [`crate::cache2q::Cache2Q`] owns exactly
//! one `RandomEngine`, seeded once, and never shares it across threads. Three independent
//! streams (byte, int, size) mirror the original engine's use of three separately-seeded
//! generators so that drawing an int doesn't perturb the byte stream used for key/value
//! content.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A per-thread pseudo-random source for bytes, signed ints, and sizes.
///
/// Not `Clone`, not `Sync`: construct a fresh instance per thread from a seed derived
/// from that thread's identity (e.g. its producer id).
#[derive(Debug)]
pub struct RandomEngine {
    byte_rng: StdRng,
    int_rng: StdRng,
    size_rng: StdRng,
}

impl RandomEngine {
    /// Creates a new engine from a single seed. The three internal streams are derived
    /// from the seed with fixed, distinct offsets so the same seed always reproduces the
    /// same sequence of draws.
    pub fn new(seed: u64) -> Self {
        Self {
            byte_rng: StdRng::seed_from_u64(seed),
            int_rng: StdRng::seed_from_u64(seed ^ 0x5151_5151_5151_5151),
            size_rng: StdRng::seed_from_u64(seed ^ 0xA5A5_A5A5_A5A5_A5A5),
        }
    }

    /// A uniform byte, 0..=255.
    pub fn rand_byte(&mut self) -> u8 {
        self.byte_rng.gen_range(0u16..=255u16) as u8
    }

    /// A uniform `i32` over its full range.
    pub fn rand_int(&mut self) -> i32 {
        self.int_rng.gen()
    }

    /// A uniform `i32` in the half-open range `[min, max)`.
    pub fn rand_int_scope(&mut self, min: i32, max: i32) -> i32 {
        assert!(min < max, "rand_int_scope: min must be < max");
        self.int_rng.gen_range(min..max)
    }

    /// A uniform `usize` over its full range.
    pub fn rand_size(&mut self) -> usize {
        self.size_rng.gen()
    }

    /// A uniform `usize` in the half-open range `[min, max)`.
    pub fn rand_size_scope(&mut self, min: usize, max: usize) -> usize {
        assert!(min < max, "rand_size_scope: min must be < max");
        self.size_rng.gen_range(min..max)
    }

    /// A binary-clean byte string of exactly `len` bytes, uniform over 0..=255 per byte.
    pub fn rand_str(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.rand_byte()).collect()
    }

    /// A binary-clean byte string whose length is uniform in `[lo, hi)`.
    pub fn rand_str_scope(&mut self, lo: usize, hi: usize) -> Vec<u8> {
        let len = self.rand_size_scope(lo, hi);
        self.rand_str(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_sequence() {
        let mut a = RandomEngine::new(42);
        let mut b = RandomEngine::new(42);
        for _ in 0..64 {
            assert_eq!(a.rand_byte(), b.rand_byte());
            assert_eq!(a.rand_int(), b.rand_int());
            assert_eq!(a.rand_size(), b.rand_size());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = RandomEngine::new(1);
        let mut b = RandomEngine::new(2);
        let seq_a: Vec<u8> = (0..32).map(|_| a.rand_byte()).collect();
        let seq_b: Vec<u8> = (0..32).map(|_| b.rand_byte()).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn scoped_draws_stay_in_range() {
        let mut re = RandomEngine::new(7);
        for _ in 0..1000 {
            let n = re.rand_size_scope(1, 21);
            assert!((1..21).contains(&n));
            let i = re.rand_int_scope(0, 99);
            assert!((0..99).contains(&i));
        }
    }

    #[test]
    fn rand_str_scope_respects_bounds() {
        let mut re = RandomEngine::new(99);
        for _ in 0..200 {
            let s = re.rand_str_scope(2, 64);
            assert!(s.len() >= 2 && s.len() < 64);
        }
    }

    #[test]
    #[should_panic(expected = "min must be < max")]
    fn rejects_empty_range() {
        let mut re = RandomEngine::new(1);
        re.rand_size_scope(5, 5);
    }
}
