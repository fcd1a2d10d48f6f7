/// Statistics tracking for audience dispatch
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time platform statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    /// Number of registered viewers (console excluded)
    pub viewers: usize,
    /// Number of cached audiences still held by a caller
    pub cached_audiences: usize,
    /// Total dispatches since startup
    pub dispatches: u64,
    /// Successful per-recipient deliveries
    pub deliveries: u64,
    /// Failed per-recipient deliveries, timeouts included
    pub failures: u64,
    /// Per-recipient deliveries that hit the send timeout
    pub timeouts: u64,
}

/// Lock-free counters updated by every dispatch
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    dispatches: AtomicU64,
    deliveries: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

impl DispatchCounters {
    pub(crate) fn record_dispatch(&self, delivered: usize, failed: usize, timed_out: usize) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.failures.fetch_add(failed as u64, Ordering::Relaxed);
        self.timeouts.fetch_add(timed_out as u64, Ordering::Relaxed);
    }

    pub(crate) fn fill(&self, stats: &mut PlatformStats) {
        stats.dispatches = self.dispatches.load(Ordering::Relaxed);
        stats.deliveries = self.deliveries.load(Ordering::Relaxed);
        stats.failures = self.failures.load(Ordering::Relaxed);
        stats.timeouts = self.timeouts.load(Ordering::Relaxed);
    }
}
