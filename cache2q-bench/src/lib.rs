//! Benchmark harness library: drives the four concurrent access regimes described by
//! [`cache2q`] against the same [`cache2q::cache2q::Cache2Q`] population and reports
//! uniform [`cache2q::metrics::ScenarioReport`]s so they can be compared side by side.
//!
//! [`scenario`] owns one runner function per fabric; [`producer`] owns the shared
//! batch-drawing/issuing logic every runner reuses.

/// The producer driver: hot/cold key-batch drawing, shared across every scenario.
pub mod producer;

/// One runner function per benchmark scenario (single-threaded, shared-lock,
/// mutex-pure, mutex-signaled, lockless), each producing a `ScenarioReport`.
pub mod scenario;
