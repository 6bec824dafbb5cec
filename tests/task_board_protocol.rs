//! End-to-end exercise of the mutex-arbitrated task board against a real cache, matching
//! the literal walkthroughs in the scenario: a four-slot board fills, drains, and drains
//! again across a batch larger than its capacity.

use std::sync::Arc;

use cache2q::board::{DrainOutcome, TaskBoard};
use cache2q::cache2q::Cache2Q;
use cache2q::config::Cache2QConfig;

fn small_cache() -> (Cache2Q, Vec<Arc<Vec<u8>>>) {
    Cache2Q::new(
        Cache2QConfig::new(16, 8, 4)
            .with_key_len(2, 8)
            .with_val_len(2, 8),
    )
}

#[test]
fn board_fills_then_trims_oversized_batch() {
    let board = TaskBoard::new(4);
    let keys: Vec<Arc<Vec<u8>>> = (0..5)
        .map(|i| Arc::new(format!("key-{i}").into_bytes()))
        .collect();

    // Submitting 5 keys against a 4-slot board only consumes 4; the caller trims its
    // own pending list by the returned count, leaving exactly the last key (E) behind.
    let submitted = board.producer_submit(1, &keys);
    assert_eq!(submitted, 4);
    let remaining = &keys[submitted..];
    assert_eq!(remaining.len(), 1);

    let (mut cache, samples) = small_cache();
    // One of the four submitted keys is a real sample (so its lookup hits); the rest
    // are made-up strings that miss.
    let mut board_keys = keys[..4].to_vec();
    board_keys[0] = Arc::clone(&samples[0]);
    let board = TaskBoard::new(4);
    board.producer_submit(1, &board_keys);

    let outcome = board.consumer_drain(&mut cache, None);
    assert_eq!(outcome, DrainOutcome::Count(4));

    let collected = board.producer_collect(1);
    assert_eq!(collected.len(), 4);
    let hits = collected.iter().filter(|(_, v)| v.is_some()).count();
    assert_eq!(hits, 1);

    // Board is fully empty again; the trimmed tail key submits cleanly into slot 0.
    let submitted_again = board.producer_submit(1, remaining);
    assert_eq!(submitted_again, 1);
}

#[test]
fn submit_then_collect_without_a_drain_yields_nothing() {
    let board = TaskBoard::new(8);
    let key = Arc::new(b"pending-key".to_vec());
    assert_eq!(board.producer_submit(1, &[key]), 1);

    // No consumer_drain has run yet, so nothing has been resolved for pid 1 to collect.
    let collected = board.producer_collect(1);
    assert!(collected.is_empty());
}

#[test]
fn a_resolved_slot_is_never_redrained() {
    let board = TaskBoard::new(4);
    let (mut cache, samples) = small_cache();
    board.producer_submit(1, &[Arc::clone(&samples[0])]);

    assert_eq!(board.consumer_drain(&mut cache, None), DrainOutcome::Count(1));
    // The slot now holds a resolved value; a second drain before collection must not
    // re-resolve it (which would double-count the cache hit).
    let hits_before = cache.hits();
    assert_eq!(board.consumer_drain(&mut cache, None), DrainOutcome::Count(0));
    assert_eq!(cache.hits(), hits_before);
}

#[test]
#[should_panic(expected = "slot 0 must be empty")]
fn plant_exit_requires_slot_zero_empty() {
    let board = TaskBoard::new(2);
    board.producer_submit(1, &[Arc::new(b"x".to_vec())]);
    board.plant_exit();
}
