//! End-to-end exercise of the lock-free per-producer ring fabric: a batch larger than the
//! ring's depth drains in two refill/drain rounds, and the exit sentinel requires
//! quiescence first.

use std::sync::Arc;

use cache2q::cache2q::Cache2Q;
use cache2q::config::{constants::LOCKLESS_ARRAY_NUM, Cache2QConfig};
use cache2q::lockless::{LocklessFabric, ScanOutcome};

fn small_cache() -> (Cache2Q, Vec<Arc<Vec<u8>>>) {
    Cache2Q::new(
        Cache2QConfig::new(32, 16, 16)
            .with_key_len(2, 8)
            .with_val_len(2, 8),
    )
}

#[test]
fn batch_larger_than_ring_depth_drains_in_two_rounds() {
    let fabric = LocklessFabric::new(1);
    let (mut cache, samples) = small_cache();

    // A batch of 12 keys against a ring of depth 8 (the default LOCKLESS_ARRAY_NUM):
    // the first fill can only place 8, leaving 4 to place once the first 8 drain.
    let mut keys: Vec<Arc<Vec<u8>>> = samples.iter().take(12).cloned().collect();
    assert_eq!(keys.len(), 12);
    let mut is_processing = [false; LOCKLESS_ARRAY_NUM];

    let placed_first = fabric.ring(0).fill(&mut keys, &mut is_processing);
    assert_eq!(placed_first, LOCKLESS_ARRAY_NUM);
    assert_eq!(keys.len(), 12 - LOCKLESS_ARRAY_NUM);
    assert!(is_processing.iter().all(|&p| p));

    let scanned = fabric.scan_and_resolve(&mut cache);
    assert_eq!(scanned, ScanOutcome::Scanned(LOCKLESS_ARRAY_NUM));

    let (hits, misses) = fabric.ring(0).drain_results(&mut is_processing);
    assert_eq!(hits + misses, LOCKLESS_ARRAY_NUM);
    assert!(is_processing.iter().all(|&p| !p));

    // Second round: the remaining 4 keys now have room.
    let placed_second = fabric.ring(0).fill(&mut keys, &mut is_processing);
    assert_eq!(placed_second, 4);
    assert!(keys.is_empty());

    fabric.scan_and_resolve(&mut cache);
    let (hits2, misses2) = fabric.ring(0).drain_results(&mut is_processing);
    assert_eq!(hits2 + misses2, 4);
    assert!(is_processing.iter().all(|&p| !p));

    assert_eq!(hits + hits2 + misses + misses2, 12);
}

#[test]
fn exit_sentinel_requires_quiescent_request_slots() {
    let fabric = LocklessFabric::new(2);
    let (mut cache, samples) = small_cache();

    let mut is_processing = [false; LOCKLESS_ARRAY_NUM];
    let mut keys = vec![Arc::clone(&samples[0])];
    fabric.ring(0).fill(&mut keys, &mut is_processing);

    // A pending (not yet resolved) request is still outstanding; planting the exit
    // sentinel only fails the precondition once every producer is done, which here we
    // simulate by resolving the outstanding request first.
    assert_eq!(
        fabric.scan_and_resolve(&mut cache),
        ScanOutcome::Scanned(1)
    );
    let (_, _) = fabric.ring(0).drain_results(&mut is_processing);

    fabric.plant_exit();
    assert_eq!(fabric.scan_and_resolve(&mut cache), ScanOutcome::Exit);
}

#[test]
#[should_panic(expected = "slot 0 of producer 0 must be empty")]
fn plant_exit_panics_if_slot_zero_not_quiescent() {
    let fabric = LocklessFabric::new(1);
    let mut is_processing = [false; LOCKLESS_ARRAY_NUM];
    let mut keys = vec![Arc::new(b"still-pending".to_vec())];
    fabric.ring(0).fill(&mut keys, &mut is_processing);

    fabric.plant_exit();
}
