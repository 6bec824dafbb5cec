#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Fabric comparison
//!
//! | Fabric | Synchronization | Who calls `Cache2Q::get` | Suspension |
//! |---|---|---|---|
//! | Single-threaded | none | the one thread | never |
//! | Shared-lock | one `parking_lot::Mutex` around the whole cache | every caller | blocks on the mutex |
//! | Mutex task board (pure) | one mutex around a fixed slot array | only the consumer | busy→idle poll, 1ms idle sleep |
//! | Mutex task board (signaled) | same, plus per-producer atomic flags | only the consumer | same, skips empty-flag ticks |
//! | Lockless ring | release/acquire atomics, no lock | only the consumer | spins, 100µs sleep once quiescent |
//!
//! ## Example: mutex task board, one producer, one consumer
//!
//! ```
//! use std::sync::Arc;
//! use cache2q::board::TaskBoard;
//! use cache2q::cache2q::Cache2Q;
//! use cache2q::config::Cache2QConfig;
//!
//! let (mut cache, samples) = Cache2Q::new(
//!     Cache2QConfig::new(64, 32, 8).with_key_len(2, 8).with_val_len(2, 8),
//! );
//! let board = TaskBoard::new(8);
//!
//! board.producer_submit(1, &[Arc::clone(&samples[0])]);
//! board.consumer_drain(&mut cache, None);
//! let results = board.producer_collect(1);
//! assert_eq!(results.len(), 1);
//! assert!(results[0].1.is_some());
//! ```

/// Tuning constants and validated configuration for the cache and the benchmark fabrics.
pub mod config;

/// The crate's one typed error, returned by fallible (`try_new`-style) constructors.
pub mod error;

/// Segment tag for the 2Q fabric.
pub mod entry;

/// Intrusive doubly linked list with O(1) splicing, used by [`cache2q`] to realize the
/// protected/probationary segments without per-hit allocation.
///
/// Internal infrastructure: exposes unsafe raw-pointer operations that require careful
/// invariant maintenance. Not meant for direct use outside this crate.
pub(crate) mod list;

/// Deterministic, per-thread random generation shared by cache construction and the
/// producer driver.
pub mod random;

/// The segmented-LRU (2Q) cache engine: [`cache2q::Cache2Q`] (unsynchronized, consumer-owned)
/// and [`cache2q::SharedCache2Q`] (single-mutex, for the shared-lock scenario).
pub mod cache2q;

/// The mutex-arbitrated task board: a fixed-size slot array shared by every producer and
/// the single consumer thread.
pub mod board;

/// The consumer busy/idle polling loop shared by the pure and signaled mutex fabrics.
pub mod consumer;

/// The lock-free per-producer ring fabric.
pub mod lockless;

/// The uniform per-scenario result shape ([`metrics::ScenarioReport`]) shared by every
/// fabric's benchmark run.
pub mod metrics;

// Re-export the core cache types at the crate root for the common case.
pub use cache2q::{Cache2Q, SharedCache2Q};
pub use config::{BenchConfig, Cache2QConfig};
pub use entry::Location;
pub use error::BenchError;
pub use metrics::{ConsumerReport, ProducerReport, ScenarioReport};
