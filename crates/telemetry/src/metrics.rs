//! Process-wide run metrics.
//!
//! Observability only: no pipeline stage reads these back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
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
}

/// Last-written value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Stage latency histogram.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 10ms, 50ms, 100ms, 500ms, 1s, 5s, 30s, 60s, 300s, +inf
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
    const BUCKET_BOUNDS: [u64; 10] = [1, 10, 50, 100, 500, 1_000, 5_000, 30_000, 60_000, 300_000];

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

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Records the time elapsed since `start`.
    pub fn observe_since(&self, start: std::time::Instant) {
        self.observe(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX));
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

    /// Bucket upper bounds with their counts; the overflow bucket is `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Counters and timings for sessionization runs.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingest
    pub lines_read: Counter,
    pub events_parsed: Counter,
    pub malformed_lines: Counter,

    // Sessionization
    pub events_rejected: Counter,
    pub sessions_built: Counter,
    pub sweep_candidates_evaluated: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub sessionize_latency_ms: Histogram,
    pub sweep_latency_ms: Histogram,

    // Gauges
    pub keys_last_run: Gauge,
    pub gap_threshold_secs: Gauge,
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
    pub lines_read: u64,
    pub events_parsed: u64,
    pub malformed_lines: u64,
    pub events_rejected: u64,
    pub sessions_built: u64,
    pub sweep_candidates_evaluated: u64,
    pub ingest_latency_mean_ms: f64,
    pub sessionize_latency_mean_ms: f64,
    pub sweep_latency_mean_ms: f64,
    pub keys_last_run: u64,
    pub gap_threshold_secs: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            lines_read: self.lines_read.get(),
            events_parsed: self.events_parsed.get(),
            malformed_lines: self.malformed_lines.get(),
            events_rejected: self.events_rejected.get(),
            sessions_built: self.sessions_built.get(),
            sweep_candidates_evaluated: self.sweep_candidates_evaluated.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            sessionize_latency_mean_ms: self.sessionize_latency_ms.mean(),
            sweep_latency_mean_ms: self.sweep_latency_ms.mean(),
            keys_last_run: self.keys_last_run.get(),
            gap_threshold_secs: self.gap_threshold_secs.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
