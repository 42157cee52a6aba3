//! Bounded, append-only record of reconciliation outcomes.
//!
//! Trigger sources write events here after the fact; the stats route reads
//! snapshots for the dashboard. Nothing in the decision path ever reads it
//! back: reconciliation derives state from the platform alone.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::reconcile::{ReconcileAction, ReconcileOutcome};
use super::scheduler::SweepSummary;

/// Most recent outcomes kept for the dashboard.
const RECENT_CAPACITY: usize = 200;

/// One recorded reconciliation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileEvent {
    pub product_id: i64,
    pub handle: String,
    pub action: ReconcileAction,
    pub at: DateTime<Utc>,
}

/// Read-only counters and recent history for the stats route.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub published: u64,
    pub unpublished: u64,
    pub failed: u64,
    pub total: u64,
    pub recent: Vec<ReconcileEvent>,
    pub last_sweep: Option<SweepSummary>,
    pub last_sweep_at: Option<DateTime<Utc>>,
}

/// Shared event log. Counters are monotonic for the process lifetime; the
/// event list is capped at [`RECENT_CAPACITY`] entries, oldest dropped first.
#[derive(Debug, Default)]
pub struct ReconcileLog {
    published: AtomicU64,
    unpublished: AtomicU64,
    failed: AtomicU64,
    recent: Mutex<VecDeque<ReconcileEvent>>,
    last_sweep: Mutex<Option<(SweepSummary, DateTime<Utc>)>>,
}

impl ReconcileLog {
    /// Record a settled reconciliation.
    pub fn record(&self, outcome: &ReconcileOutcome) {
        match outcome.action {
            ReconcileAction::Published => self.published.fetch_add(1, Ordering::Relaxed),
            ReconcileAction::Unpublished => self.unpublished.fetch_add(1, Ordering::Relaxed),
        };

        let event = ReconcileEvent {
            product_id: outcome.product_id,
            handle: outcome.handle.clone(),
            action: outcome.action,
            at: Utc::now(),
        };

        let mut recent = self.recent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if recent.len() == RECENT_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(event);
    }

    /// Record a reconciliation that errored out.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed sweep.
    pub fn record_sweep(&self, summary: SweepSummary) {
        let mut last = self
            .last_sweep
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *last = Some((summary, Utc::now()));
    }

    /// Snapshot for the stats route.
    pub fn snapshot(&self) -> StatsSnapshot {
        let published = self.published.load(Ordering::Relaxed);
        let unpublished = self.unpublished.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);

        let recent = self
            .recent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();

        let (last_sweep, last_sweep_at) = self
            .last_sweep
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
            .map_or((None, None), |(summary, at)| (Some(summary), Some(at)));

        StatsSnapshot {
            published,
            unpublished,
            failed,
            total: published + unpublished + failed,
            recent,
            last_sweep,
            last_sweep_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(product_id: i64, action: ReconcileAction) -> ReconcileOutcome {
        ReconcileOutcome {
            product_id,
            handle: format!("title-{product_id}-used-good"),
            in_stock: matches!(action, ReconcileAction::Published),
            action,
        }
    }

    #[test]
    fn test_counters_accumulate() {
        let log = ReconcileLog::default();
        log.record(&outcome(1, ReconcileAction::Published));
        log.record(&outcome(2, ReconcileAction::Unpublished));
        log.record(&outcome(3, ReconcileAction::Unpublished));
        log.record_failure();

        let snapshot = log.snapshot();
        assert_eq!(snapshot.published, 1);
        assert_eq!(snapshot.unpublished, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.total, 4);
        assert_eq!(snapshot.recent.len(), 3);
    }

    #[test]
    fn test_recent_is_bounded() {
        let log = ReconcileLog::default();
        for i in 0..(RECENT_CAPACITY as i64 + 50) {
            log.record(&outcome(i, ReconcileAction::Published));
        }

        let snapshot = log.snapshot();
        assert_eq!(snapshot.recent.len(), RECENT_CAPACITY);
        // Oldest entries dropped first.
        assert_eq!(snapshot.recent.first().map(|e| e.product_id), Some(50));
    }

    #[test]
    fn test_last_sweep_recorded() {
        let log = ReconcileLog::default();
        assert!(log.snapshot().last_sweep.is_none());

        log.record_sweep(SweepSummary {
            products_seen: 12,
            reconciled: 10,
            failures: 2,
            truncated: false,
        });

        let snapshot = log.snapshot();
        assert_eq!(snapshot.last_sweep.map(|s| s.products_seen), Some(12));
        assert!(snapshot.last_sweep_at.is_some());
    }
}
