//! Per-agent consultation counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lock-free counters updated on every consultation.
#[derive(Debug, Default)]
pub struct AgentMetrics {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    total_micros: AtomicU64,
    max_micros: AtomicU64,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one consultation.
    pub fn record(&self, elapsed: Duration, success: bool) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.max_micros.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let total_micros = self.total_micros.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.succeeded.load(Ordering::Relaxed),
            failed_requests: self.failed.load(Ordering::Relaxed),
            average_latency: if total == 0 {
                Duration::ZERO
            } else {
                Duration::from_micros(total_micros / total)
            },
            max_latency: Duration::from_micros(self.max_micros.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of [`AgentMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_latency: Duration,
    pub max_latency: Duration,
}

impl MetricsSnapshot {
    /// Fraction of successful consultations; 1.0 before any traffic.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record() {
        let metrics = AgentMetrics::new();
        metrics.record(Duration::from_millis(10), true);
        metrics.record(Duration::from_millis(30), false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.average_latency, Duration::from_millis(20));
        assert_eq!(snapshot.max_latency, Duration::from_millis(30));
        assert_eq!(snapshot.success_rate(), 0.5);
    }

    #[test]
    fn test_empty_metrics() {
        let snapshot = AgentMetrics::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.success_rate(), 1.0);
    }
}
