//! # state
//!
//! Everything the ingestion loop remembers between iterations.
//!
//! ## Design Decisions
//!
//! * [`IngestState`] is owned by the scheduler task and handed to each task
//!   as `&mut`. There is no lock around it: only one loop ever touches it.
//! * Observers (the status endpoint) never see `IngestState` directly. After
//!   every iteration the scheduler publishes a [`StatusSnapshot`] on a
//!   `tokio::sync::watch` channel; readers clone the latest value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::clock::iso_millis;
use crate::engine::pipeline::CyclePhase;
use crate::engine::retry::FailureBudget;
use crate::engine::scheduler::Schedule;
use crate::engine::tasks::DepthCapability;
use crate::models::{HeartbeatRecord, Timeframe};
use crate::session::{Session, SessionTracker};
use crate::watermark::Watermark;

// ─── Bar Cursors ──────────────────────────────────────────────────────────────

/// Last written bar period start per timeframe. Process-local: after a
/// restart the first sync re-appends the lookback window.
#[derive(Debug, Clone, Default)]
pub struct BarCursors {
    last: BTreeMap<Timeframe, i64>,
}

impl BarCursors {
    pub fn get(&self, tf: Timeframe) -> i64 {
        self.last.get(&tf).copied().unwrap_or(0)
    }

    /// Moves the cursor forward only.
    pub fn advance(&mut self, tf: Timeframe, period_start: i64) {
        let slot = self.last.entry(tf).or_insert(0);
        if period_start > *slot {
            *slot = period_start;
        }
    }
}

// ─── IngestState ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IngestState {
    pub watermark:   Watermark,
    pub failures:    FailureBudget,
    /// Ticks appended since process start.
    pub total_ticks: u64,
    /// Raw size of the most recent fetch.
    pub last_batch:  usize,
    /// Furthest phase the latest tick cycle reached.
    pub last_phase:  CyclePhase,
    pub session:     SessionTracker,
    pub bar_cursors: BarCursors,
    pub depth:       DepthCapability,
    pub schedule:    Schedule,
}

impl IngestState {
    pub fn new(watermark: Watermark, max_fails: u32, schedule: Schedule) -> Self {
        Self {
            watermark,
            failures:    FailureBudget::new(max_fails),
            total_ticks: 0,
            last_batch:  0,
            last_phase:  CyclePhase::Idle,
            session:     SessionTracker::new(),
            bar_cursors: BarCursors::default(),
            depth:       DepthCapability::Unknown,
            schedule,
        }
    }
}

// ─── Status Snapshot ──────────────────────────────────────────────────────────

/// Read-only view published after every loop iteration.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub run_id:               Uuid,
    pub symbol:               String,
    pub source:               String,
    pub started_at:           DateTime<Utc>,
    pub updated_at:           DateTime<Utc>,
    pub watermark_msc:        i64,
    pub watermark_dt:         String,
    pub total_ticks:          u64,
    pub last_batch:           usize,
    pub consecutive_failures: u32,
    pub last_phase:           CyclePhase,
    pub depth:                DepthCapability,
    pub session:              Option<Session>,
    pub last_heartbeat:       Option<HeartbeatRecord>,
}

impl StatusSnapshot {
    pub fn initial(symbol: &str, source: &str, state: &IngestState, now: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            run_id:               Uuid::new_v4(),
            symbol:               symbol.to_string(),
            source:               source.to_string(),
            started_at:           now,
            updated_at:           now,
            watermark_msc:        0,
            watermark_dt:         String::new(),
            total_ticks:          0,
            last_batch:           0,
            consecutive_failures: 0,
            last_phase:           CyclePhase::Idle,
            depth:                DepthCapability::Unknown,
            session:              None,
            last_heartbeat:       None,
        };
        snapshot.refresh(state, None, now);
        snapshot
    }

    /// Copy the live counters in; keep the previous heartbeat unless a new
    /// one was written this iteration.
    pub fn refresh(&mut self, state: &IngestState, heartbeat: Option<&HeartbeatRecord>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.watermark_msc = state.watermark.last_tick_time;
        self.watermark_dt = iso_millis(state.watermark.last_tick_time);
        self.total_ticks = state.total_ticks;
        self.last_batch = state.last_batch;
        self.consecutive_failures = state.failures.consecutive();
        self.last_phase = state.last_phase;
        self.depth = state.depth;
        self.session = state.session.current();
        if let Some(hb) = heartbeat {
            self.last_heartbeat = Some(hb.clone());
        }
    }
}

/// Receiving end handed to the status endpoint.
pub type SharedStatus = watch::Receiver<StatusSnapshot>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_cursor_is_monotonic() {
        let mut cursors = BarCursors::default();
        assert_eq!(cursors.get(Timeframe::M1), 0);

        cursors.advance(Timeframe::M1, 1_704_114_000);
        cursors.advance(Timeframe::M1, 1_704_113_940);
        assert_eq!(cursors.get(Timeframe::M1), 1_704_114_000);
        assert_eq!(cursors.get(Timeframe::H1), 0);
    }
}
