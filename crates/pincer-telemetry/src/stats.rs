//! Session-level counters.
//!
//! Lightweight atomic counters updated from the hot path and dumped as
//! one structured summary line, periodically and at shutdown.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Counters for one bot session.
///
/// All counters are monotonic and updated with relaxed ordering; the
/// summary is a best-effort snapshot, not an audit trail.
#[derive(Debug)]
pub struct SessionStats {
    started_at: DateTime<Utc>,
    ticks_seen: AtomicU64,
    ticks_dropped: AtomicU64,
    opportunities: AtomicU64,
    cycles_started: AtomicU64,
    cycles_captured: AtomicU64,
    cycles_liquidated: AtomicU64,
    cycles_no_fill: AtomicU64,
    cycles_aborted: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ticks_seen: AtomicU64::new(0),
            ticks_dropped: AtomicU64::new(0),
            opportunities: AtomicU64::new(0),
            cycles_started: AtomicU64::new(0),
            cycles_captured: AtomicU64::new(0),
            cycles_liquidated: AtomicU64::new(0),
            cycles_no_fill: AtomicU64::new(0),
            cycles_aborted: AtomicU64::new(0),
        }
    }

    /// A tick reached the application, whether or not it was applied.
    pub fn record_tick(&self) {
        self.ticks_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// A tick was discarded because a cycle held the execution lock.
    pub fn record_tick_dropped(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// The detector produced a tradeable opportunity.
    pub fn record_opportunity(&self) {
        self.opportunities.fetch_add(1, Ordering::Relaxed);
    }

    /// A cycle acquired the lock and started executing.
    pub fn record_cycle_started(&self) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_captured(&self) {
        self.cycles_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_liquidated(&self) {
        self.cycles_liquidated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_no_fill(&self) {
        self.cycles_no_fill.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_aborted(&self) {
        self.cycles_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_seen(&self) -> u64 {
        self.ticks_seen.load(Ordering::Relaxed)
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycles_started.load(Ordering::Relaxed)
    }

    /// Emit the session summary as one structured log line.
    pub fn log_summary(&self) {
        let uptime_secs = (Utc::now() - self.started_at).num_seconds();
        info!(
            uptime_secs,
            ticks_seen = self.ticks_seen.load(Ordering::Relaxed),
            ticks_dropped = self.ticks_dropped.load(Ordering::Relaxed),
            opportunities = self.opportunities.load(Ordering::Relaxed),
            cycles_started = self.cycles_started.load(Ordering::Relaxed),
            cycles_captured = self.cycles_captured.load(Ordering::Relaxed),
            cycles_liquidated = self.cycles_liquidated.load(Ordering::Relaxed),
            cycles_no_fill = self.cycles_no_fill.load(Ordering::Relaxed),
            cycles_aborted = self.cycles_aborted.load(Ordering::Relaxed),
            "Session statistics"
        );
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = SessionStats::new();

        stats.record_tick();
        stats.record_tick();
        stats.record_tick_dropped();
        stats.record_cycle_started();

        assert_eq!(stats.ticks_seen(), 2);
        assert_eq!(stats.cycles_started(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let stats = Arc::new(SessionStats::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let s = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    s.record_tick();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.ticks_seen(), 400);
    }
}
