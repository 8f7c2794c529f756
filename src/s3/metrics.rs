//! Metrics collection for storage requests.
//!
//! Thread-safe tracking of how many requests each storage operation issued and
//! how long they took.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Aggregated numbers for one operation kind (`stat`, `list`, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub requests: usize,
    pub failures: usize,
    pub total_time: Duration,
}

/// Collector shared between a backend and whoever reports on it
#[derive(Debug, Default)]
pub struct StorageMetrics {
    /// Total number of requests
    request_count: AtomicUsize,
    /// Total time spent in requests (nanoseconds)
    total_request_time_ns: AtomicU64,
    /// Per-operation breakdown
    operations: RwLock<BTreeMap<&'static str, OperationStats>>,
}

impl StorageMetrics {
    /// Create a new metrics collector wrapped in Arc for sharing
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a completed request
    pub fn record(&self, op: &'static str, duration: Duration, succeeded: bool) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_request_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        if let Ok(mut operations) = self.operations.write() {
            let stats = operations.entry(op).or_default();
            stats.requests += 1;
            stats.total_time += duration;
            if !succeeded {
                stats.failures += 1;
            }
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn total_request_time(&self) -> Duration {
        Duration::from_nanos(self.total_request_time_ns.load(Ordering::Relaxed))
    }

    /// Snapshot of the per-operation numbers, sorted by operation name
    pub fn operations(&self) -> Vec<(&'static str, OperationStats)> {
        self.operations
            .read()
            .map(|ops| ops.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.request_count.store(0, Ordering::Relaxed);
        self.total_request_time_ns.store(0, Ordering::Relaxed);
        if let Ok(mut operations) = self.operations.write() {
            operations.clear();
        }
    }
}
