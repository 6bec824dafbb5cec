//! Scenario-level metrics: the uniform result shape every fabric's benchmark run produces,
//! regardless of whether it was the single-threaded, shared-lock, mutex, or lockless
//! scenario.
//!
//! # Why `BTreeMap` for the flattened summary
//!
//! [`ScenarioReport::summary`] flattens every counter into a `BTreeMap<String, f64>` rather
//! than a `HashMap`, for the same reason the teacher crate's own metrics module reaches for
//! `BTreeMap`: deterministic key ordering makes repeated runs diffable and keeps comparison
//! tables stable across scenarios, which matters more here than the map's O(log n) lookup
//! cost ever will at a few dozen keys.

use std::collections::BTreeMap;
use std::time::Duration;

/// Per-producer counters accumulated over one scenario run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProducerReport {
    /// This producer's id, 1-indexed.
    pub pid: usize,
    /// Total lookups this producer issued (hits + misses).
    pub requests: u64,
    /// Lookups that resolved to a resident key.
    pub hits: u64,
    /// Lookups that resolved to [miss](crate::cache2q::Cache2Q::get) (`None`).
    pub misses: u64,
    /// Wall time from this producer's first submit to its last collected result.
    pub elapsed: Duration,
    /// Times this producer found its outbound channel (board slot or ring) full/empty and
    /// had to retry (mutex fabrics: board-full retries; lockless: `request_wait_cnt` +
    /// `result_wait_cnt` combined).
    pub wait_retry_cnt: u64,
    /// The longest run of consecutive wait-retries this producer saw in one fill/drain
    /// round, reset to zero on every successful round (mirrors the source's
    /// `max_wait_burst`).
    pub max_wait_burst: u64,
}

impl ProducerReport {
    /// Hit rate in `[0.0, 1.0]`; `0.0` if no requests were issued (matches the source's
    /// avoidance of zero-division rather than returning `NaN`).
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }

    /// Miss percentage as an integer-truncated value, matching the source's reporting
    /// style (see SPEC_FULL §9: tests assert counts exactly and only tolerate the derived
    /// percentage).
    pub fn miss_percent_truncated(&self) -> u64 {
        if self.requests == 0 {
            0
        } else {
            self.misses * 100 / self.requests
        }
    }

    /// Queries per second, derived from `requests * 1000 / elapsed_ms`. Returns `0.0` if
    /// elapsed time rounds to zero milliseconds (a vanishingly short run).
    pub fn qps(&self) -> f64 {
        let elapsed_ms = self.elapsed.as_millis();
        if elapsed_ms == 0 {
            0.0
        } else {
            (self.requests as f64) * 1000.0 / (elapsed_ms as f64)
        }
    }
}

/// Per-fabric consumer-side counters; the shape varies by fabric, so this is an enum rather
/// than a single struct with fields some variants never populate.
#[derive(Debug, Clone, Copy)]
pub enum ConsumerReport {
    /// The mutex-arbitrated fabrics (pure and signaled share the same loop skeleton and
    /// counter shape; see [`crate::consumer`]).
    Mutex {
        /// Total requests drained over the consumer's lifetime.
        bench_cnt: u64,
        /// Busy-mode and idle-mode iterations that found nothing to drain.
        wait_try_cnt: u64,
        /// Idle-mode sleeps taken.
        sleep_cnt: u64,
    },
    /// The lock-free fabric (see [`crate::lockless`]).
    Lockless {
        /// Total requests resolved over the consumer's lifetime.
        batch_cnt: u64,
        /// Scan passes that found nothing pending.
        wait_cnt: u64,
    },
}

/// The full result of one scenario run: which fabric (or none, for the single-threaded
/// baseline), every producer's counters, the consumer's counters (absent for the
/// single-threaded and shared-lock scenarios, which have no separate consumer thread), and
/// the cache's own hit/miss tallies.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Human-readable scenario name, e.g. `"mutex-signaled"`, used as the comparison
    /// table's row label.
    pub scenario: String,
    /// Wall time for the whole scenario, start of the first thread to join of the last.
    pub elapsed: Duration,
    /// One entry per producer thread that ran.
    pub producers: Vec<ProducerReport>,
    /// The consumer thread's counters, or `None` for scenarios with no separate consumer
    /// (single-threaded, shared-lock).
    pub consumer: Option<ConsumerReport>,
}

impl ScenarioReport {
    /// Total requests summed across every producer.
    pub fn total_requests(&self) -> u64 {
        self.producers.iter().map(|p| p.requests).sum()
    }

    /// Total hits summed across every producer.
    pub fn total_hits(&self) -> u64 {
        self.producers.iter().map(|p| p.hits).sum()
    }

    /// Total misses summed across every producer.
    pub fn total_misses(&self) -> u64 {
        self.producers.iter().map(|p| p.misses).sum()
    }

    /// Aggregate queries per second across every producer, derived from the scenario's
    /// total elapsed wall time rather than summing each producer's individual QPS (which
    /// would double-count overlapping wall-clock windows).
    pub fn aggregate_qps(&self) -> f64 {
        let elapsed_ms = self.elapsed.as_millis();
        if elapsed_ms == 0 {
            0.0
        } else {
            (self.total_requests() as f64) * 1000.0 / (elapsed_ms as f64)
        }
    }

    /// Flattens every counter into a deterministically-ordered map, keyed
    /// `"producer.<pid>.<field>"` / `"consumer.<field>"` / `"scenario.<field>"`, suitable
    /// for a uniform comparison table across scenarios.
    pub fn summary(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        out.insert(
            "scenario.elapsed_ms".to_string(),
            self.elapsed.as_millis() as f64,
        );
        out.insert(
            "scenario.total_requests".to_string(),
            self.total_requests() as f64,
        );
        out.insert("scenario.total_hits".to_string(), self.total_hits() as f64);
        out.insert(
            "scenario.total_misses".to_string(),
            self.total_misses() as f64,
        );
        out.insert("scenario.aggregate_qps".to_string(), self.aggregate_qps());

        for p in &self.producers {
            let prefix = format!("producer.{}", p.pid);
            out.insert(format!("{prefix}.requests"), p.requests as f64);
            out.insert(format!("{prefix}.hits"), p.hits as f64);
            out.insert(format!("{prefix}.misses"), p.misses as f64);
            out.insert(format!("{prefix}.qps"), p.qps());
            out.insert(format!("{prefix}.hit_rate"), p.hit_rate());
            out.insert(
                format!("{prefix}.wait_retry_cnt"),
                p.wait_retry_cnt as f64,
            );
            out.insert(
                format!("{prefix}.max_wait_burst"),
                p.max_wait_burst as f64,
            );
        }

        match self.consumer {
            Some(ConsumerReport::Mutex {
                bench_cnt,
                wait_try_cnt,
                sleep_cnt,
            }) => {
                out.insert("consumer.bench_cnt".to_string(), bench_cnt as f64);
                out.insert("consumer.wait_try_cnt".to_string(), wait_try_cnt as f64);
                out.insert("consumer.sleep_cnt".to_string(), sleep_cnt as f64);
            }
            Some(ConsumerReport::Lockless {
                batch_cnt,
                wait_cnt,
            }) => {
                out.insert("consumer.batch_cnt".to_string(), batch_cnt as f64);
                out.insert("consumer.wait_cnt".to_string(), wait_cnt as f64);
            }
            None => {}
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_and_qps_are_zero_for_no_requests() {
        let p = ProducerReport::default();
        assert_eq!(p.hit_rate(), 0.0);
        assert_eq!(p.qps(), 0.0);
        assert_eq!(p.miss_percent_truncated(), 0);
    }

    #[test]
    fn miss_percent_truncates() {
        let p = ProducerReport {
            pid: 1,
            requests: 3,
            hits: 2,
            misses: 1,
            ..Default::default()
        };
        // 1/3 = 33.33...%, truncated to 33.
        assert_eq!(p.miss_percent_truncated(), 33);
    }

    #[test]
    fn qps_derives_from_elapsed_ms() {
        let p = ProducerReport {
            requests: 2000,
            elapsed: Duration::from_millis(1000),
            ..Default::default()
        };
        assert_eq!(p.qps(), 2000.0);
    }

    #[test]
    fn summary_is_deterministically_ordered_and_complete() {
        let report = ScenarioReport {
            scenario: "mutex-signaled".to_string(),
            elapsed: Duration::from_millis(500),
            producers: vec![
                ProducerReport {
                    pid: 1,
                    requests: 100,
                    hits: 90,
                    misses: 10,
                    elapsed: Duration::from_millis(500),
                    wait_retry_cnt: 2,
                    max_wait_burst: 1,
                },
                ProducerReport {
                    pid: 2,
                    requests: 100,
                    hits: 88,
                    misses: 12,
                    elapsed: Duration::from_millis(500),
                    wait_retry_cnt: 0,
                    max_wait_burst: 0,
                },
            ],
            consumer: Some(ConsumerReport::Mutex {
                bench_cnt: 200,
                wait_try_cnt: 5,
                sleep_cnt: 1,
            }),
        };

        let summary = report.summary();
        assert_eq!(summary["scenario.total_requests"], 200.0);
        assert_eq!(summary["scenario.total_hits"], 178.0);
        assert_eq!(summary["producer.1.hits"], 90.0);
        assert_eq!(summary["producer.2.wait_retry_cnt"], 0.0);
        assert_eq!(summary["consumer.bench_cnt"], 200.0);

        // BTreeMap iteration order is sorted lexicographically by key.
        let keys: Vec<&String> = summary.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn lockless_consumer_report_is_distinct_shape() {
        let report = ScenarioReport {
            scenario: "lockless".to_string(),
            elapsed: Duration::from_millis(10),
            producers: vec![],
            consumer: Some(ConsumerReport::Lockless {
                batch_cnt: 42,
                wait_cnt: 7,
            }),
        };
        let summary = report.summary();
        assert_eq!(summary["consumer.batch_cnt"], 42.0);
        assert_eq!(summary["consumer.wait_cnt"], 7.0);
        assert!(!summary.contains_key("consumer.bench_cnt"));
    }
}
