//! Internal metrics collection.
//!
//! Counters accumulate across a driver sweep and are snapshotted and logged
//! when the sweep finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the aggregation engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Source query metrics
    pub source_queries: Counter,
    pub source_query_errors: Counter,
    pub query_retries: Counter,
    pub records_scanned: Counter,

    // Pipeline metrics
    pub collector_failures: Counter,
    pub identity_collisions: Counter,
    pub events_without_uid: Counter,
    pub internal_events_skipped: Counter,

    // Materialization metrics
    pub rows_written: Counter,
    pub rows_failed: Counter,
    pub batches_failed: Counter,

    // Job outcomes
    pub jobs_succeeded: Counter,
    pub jobs_failed: Counter,

    // Latency histograms
    pub source_query_latency_ms: Histogram,
    pub materialize_latency_ms: Histogram,
    pub job_latency_ms: Histogram,

    // Gauges
    pub active_jobs: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub source_queries: u64,
    pub source_query_errors: u64,
    pub query_retries: u64,
    pub records_scanned: u64,
    pub collector_failures: u64,
    pub identity_collisions: u64,
    pub events_without_uid: u64,
    pub internal_events_skipped: u64,
    pub rows_written: u64,
    pub rows_failed: u64,
    pub batches_failed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub source_query_latency_mean_ms: f64,
    pub materialize_latency_mean_ms: f64,
    pub job_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            source_queries: self.source_queries.get(),
            source_query_errors: self.source_query_errors.get(),
            query_retries: self.query_retries.get(),
            records_scanned: self.records_scanned.get(),
            collector_failures: self.collector_failures.get(),
            identity_collisions: self.identity_collisions.get(),
            events_without_uid: self.events_without_uid.get(),
            internal_events_skipped: self.internal_events_skipped.get(),
            rows_written: self.rows_written.get(),
            rows_failed: self.rows_failed.get(),
            batches_failed: self.batches_failed.get(),
            jobs_succeeded: self.jobs_succeeded.get(),
            jobs_failed: self.jobs_failed.get(),
            source_query_latency_mean_ms: self.source_query_latency_ms.mean(),
            materialize_latency_mean_ms: self.materialize_latency_ms.mean(),
            job_latency_mean_ms: self.job_latency_ms.mean(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
