//! In-process pipeline metrics.
//!
//! Counters accumulate over the process lifetime; a snapshot is logged
//! after every pipeline run.

use chrono::{DateTime, Utc};
use serde::Serialize;
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
}

/// A gauge metric (last observed value).
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
}

/// Histogram for durations in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s, 1m, 5m, 15m
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
    const BUCKET_BOUNDS: [u64; 11] = [
        10, 50, 100, 250, 500, 1_000, 5_000, 10_000, 60_000, 300_000, 900_000,
    ];

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
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
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

    /// Returns (upper bound, count) per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the sales pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Runs
    pub runs_started: Counter,
    pub runs_succeeded: Counter,
    pub runs_failed: Counter,
    pub task_failures: Counter,
    pub task_retries: Counter,

    // Extraction and transformation
    pub products_extracted: Counter,
    pub sales_extracted: Counter,
    pub rows_rejected: Counter,
    pub orphan_sales: Counter,

    // Warehouse
    pub warehouse_inserts: Counter,
    pub warehouse_insert_errors: Counter,
    pub rows_loaded: Counter,

    // Analysis
    pub low_performance_alerts: Gauge,

    // Latency histograms
    pub run_duration_ms: Histogram,
    pub warehouse_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub task_failures: u64,
    pub task_retries: u64,
    pub products_extracted: u64,
    pub sales_extracted: u64,
    pub rows_rejected: u64,
    pub orphan_sales: u64,
    pub warehouse_inserts: u64,
    pub warehouse_insert_errors: u64,
    pub rows_loaded: u64,
    pub low_performance_alerts: u64,
    pub run_duration_mean_ms: f64,
    pub warehouse_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            runs_started: self.runs_started.get(),
            runs_succeeded: self.runs_succeeded.get(),
            runs_failed: self.runs_failed.get(),
            task_failures: self.task_failures.get(),
            task_retries: self.task_retries.get(),
            products_extracted: self.products_extracted.get(),
            sales_extracted: self.sales_extracted.get(),
            rows_rejected: self.rows_rejected.get(),
            orphan_sales: self.orphan_sales.get(),
            warehouse_inserts: self.warehouse_inserts.get(),
            warehouse_insert_errors: self.warehouse_insert_errors.get(),
            rows_loaded: self.rows_loaded.get(),
            low_performance_alerts: self.low_performance_alerts.get(),
            run_duration_mean_ms: self.run_duration_ms.mean(),
            warehouse_latency_mean_ms: self.warehouse_latency_ms.mean(),
        }
    }
}

/// Log a snapshot at info level.
pub fn log_snapshot(snapshot: &MetricsSnapshot) {
    tracing::info!(
        runs_started = snapshot.runs_started,
        runs_succeeded = snapshot.runs_succeeded,
        runs_failed = snapshot.runs_failed,
        task_retries = snapshot.task_retries,
        rows_rejected = snapshot.rows_rejected,
        rows_loaded = snapshot.rows_loaded,
        low_performance_alerts = snapshot.low_performance_alerts,
        run_duration_mean_ms = snapshot.run_duration_mean_ms,
        "Pipeline metrics"
    );
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
