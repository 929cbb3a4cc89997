//! # engine::pipeline
//!
//! **Tick cycle** — รันทุก loop iteration
//!
//! ```text
//! Idle → Fetching ─┬─ fetch error ──────────────▶ Retrying | WatermarkReset
//!                  ├─ empty ────────────────────▶ Empty
//!                  └─ Deduping ─┬─ max ≤ wm ────▶ Stale
//!                               └─ Enriching → Appending → Advancing → Ingested
//! ```
//!
//! A tick is new when `time_msc >= watermark`, and the watermark moves to
//! `max_time + 1` once the batch is on disk. The watermark is only touched
//! after a successful append, so a failed write re-fetches the same window
//! next time round.
//!
//! After `max_fails` consecutive fetch errors the watermark jumps to
//! `now − 1s` and every tick in between is lost. That is logged at `warn`
//! with the size of the hole. A watermark already past `now − 1s` stays
//! where it is: the reset never moves backwards.
//!
//! `IngestState::last_phase` keeps the furthest phase the latest cycle
//! reached and is published with the status snapshot.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::{iso_millis, msc_to_dt};
use crate::enrich::enrich_ticks;
use crate::error::SourceError;
use crate::state::IngestState;
use crate::watermark::Watermark;

use super::retry::{FailureVerdict, RESET_LAG_MS};
use super::TaskEnv;

// ─── Phase / Outcome ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Deduping,
    Enriching,
    Appending,
    Advancing,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Idle      => "IDLE",
            CyclePhase::Fetching  => "FETCHING",
            CyclePhase::Deduping  => "DEDUPING",
            CyclePhase::Enriching => "ENRICHING",
            CyclePhase::Appending => "APPENDING",
            CyclePhase::Advancing => "ADVANCING",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Source had nothing.
    Empty,
    /// Only boundary records already covered by the watermark.
    Stale { batch: usize },
    /// Rows appended and watermark moved.
    Ingested { rows: usize, watermark: i64 },
    /// Fetch failed, still within budget.
    Retrying { attempt: u32, max: u32 },
    /// Fetch failed and the budget ran out: backlog abandoned.
    WatermarkReset { from: i64, to: i64 },
    /// Something after the fetch failed; watermark untouched.
    Faulted { phase: CyclePhase, reason: String },
}

impl CycleOutcome {
    /// The fetch itself failed (heartbeat is skipped, retry backoff applies).
    pub fn fetch_failed(&self) -> bool {
        matches!(self, CycleOutcome::Retrying { .. } | CycleOutcome::WatermarkReset { .. })
    }
}

// ─── Tick Cycle ───────────────────────────────────────────────────────────────

pub async fn run_tick_cycle(env: &TaskEnv<'_>, state: &mut IngestState) -> CycleOutcome {
    let watermark = state.watermark.last_tick_time;

    // ── 1. Fetch ──────────────────────────────────────────────────────────────
    state.last_phase = CyclePhase::Fetching;
    let raw = match env
        .source
        .fetch_ticks(&env.config.symbol, watermark, env.config.tick_batch)
        .await
    {
        Ok(raw) => {
            state.failures.record_success();
            raw
        }
        Err(e) => return on_fetch_failure(env, state, e),
    };
    state.last_batch = raw.len();

    let Some(max_time) = raw.iter().map(|t| t.time_msc).max() else {
        return CycleOutcome::Empty;
    };

    // ── 2. Dedup ──────────────────────────────────────────────────────────────
    state.last_phase = CyclePhase::Deduping;
    if max_time <= watermark {
        debug!(batch = raw.len(), max_time, watermark, "[TICKS] Nothing past watermark");
        return CycleOutcome::Stale { batch: raw.len() };
    }
    let fresh: Vec<_> = raw.into_iter().filter(|t| t.time_msc >= watermark).collect();

    // ── 3. Enrich ─────────────────────────────────────────────────────────────
    state.last_phase = CyclePhase::Enriching;
    let rows = enrich_ticks(&fresh);

    // ── 4. Append ─────────────────────────────────────────────────────────────
    state.last_phase = CyclePhase::Appending;
    if let Err(e) = env.logs.ticks.append(&rows) {
        error!(
            error = %e,
            path  = %env.logs.ticks.path().display(),
            rows  = rows.len(),
            watermark,
            "[TICKS] Append failed — watermark held"
        );
        return CycleOutcome::Faulted { phase: CyclePhase::Appending, reason: e.to_string() };
    }

    // ── 5. Advance ────────────────────────────────────────────────────────────
    state.last_phase = CyclePhase::Advancing;
    let now = env.clock.now();
    let next = max_time + 1;
    state.total_ticks += rows.len() as u64;
    state.watermark = Watermark::new(next, now);
    env.store.save(next, now);

    debug!(
        rows  = rows.len(),
        last  = %iso_millis(max_time),
        total = state.total_ticks,
        "[TICKS] Batch ingested"
    );

    // ── 6. Session check ──────────────────────────────────────────────────────
    if let Some(event) = state.session.observe(msc_to_dt(max_time)) {
        info!(
            session  = %event.session,
            previous = event.previous_session.map(|s| s.as_str()).unwrap_or("-"),
            "[SESSION] Session change"
        );
        if let Err(e) = env.logs.sessions.append(std::slice::from_ref(&event)) {
            warn!(error = %e, "[SESSION] Failed to log session change");
        }
    }

    CycleOutcome::Ingested { rows: rows.len(), watermark: next }
}

fn on_fetch_failure(env: &TaskEnv<'_>, state: &mut IngestState, err: SourceError) -> CycleOutcome {
    state.last_batch = 0;

    match state.failures.record_failure() {
        FailureVerdict::Retry { attempt, max } => {
            warn!(attempt, max, error = %err, "[TICKS] Fetch failed — retrying");
            CycleOutcome::Retrying { attempt, max }
        }
        FailureVerdict::Exhausted { attempts } => {
            let now = env.clock.now();
            let from = state.watermark.last_tick_time;
            let to = from.max(now.timestamp_millis() - RESET_LAG_MS);
            state.watermark = Watermark::new(to, now);

            warn!(
                attempts,
                error      = %err,
                from       = %iso_millis(from),
                to         = %iso_millis(to),
                skipped_ms = to - from,
                "[TICKS] Too many consecutive failures — watermark reset, ticks in the gap are NOT recoverable"
            );
            CycleOutcome::WatermarkReset { from, to }
        }
    }
}
