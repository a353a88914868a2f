//! Synchronization metrics.
//!
//! `SyncMetrics` is shared by the population view and its tracker so the
//! ordering discipline is observable: every planned fetch, applied page,
//! discarded stale response and suppressed poll tick is counted.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked across population fetches.
#[derive(Debug)]
pub struct SyncMetrics {
    /// Total fetches planned (initial, load-more and poll).
    pub fetches_planned: AtomicU64,

    /// Total pages applied to the view (replaces and appends).
    pub pages_applied: AtomicU64,

    /// Total responses discarded because their filter epoch was stale.
    pub stale_discarded: AtomicU64,

    /// Total poll ticks suppressed by the gating rules.
    pub polls_suppressed: AtomicU64,

    /// Total fetches that resolved to an error.
    pub fetches_failed: AtomicU64,
}

impl SyncMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fetches_planned: AtomicU64::new(0),
            pages_applied: AtomicU64::new(0),
            stale_discarded: AtomicU64::new(0),
            polls_suppressed: AtomicU64::new(0),
            fetches_failed: AtomicU64::new(0),
        }
    }

    /// Records that a fetch was planned.
    pub fn record_fetch_planned(&self) {
        self.fetches_planned.fetch_add(1, Ordering::Relaxed);
    }

    /// Records that a page was applied to the view.
    pub fn record_page_applied(&self) {
        self.pages_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a stale response discard.
    pub fn record_stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a suppressed poll tick.
    pub fn record_poll_suppressed(&self) {
        self.polls_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed fetch.
    pub fn record_fetch_failed(&self) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of the current counters.
    #[must_use]
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            fetches_planned: self.fetches_planned.load(Ordering::Relaxed),
            pages_applied: self.pages_applied.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            polls_suppressed: self.polls_suppressed.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of [`SyncMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    /// Total fetches planned.
    pub fetches_planned: u64,

    /// Total pages applied.
    pub pages_applied: u64,

    /// Total stale discards.
    pub stale_discarded: u64,

    /// Total suppressed poll ticks.
    pub polls_suppressed: u64,

    /// Total failed fetches.
    pub fetches_failed: u64,
}
