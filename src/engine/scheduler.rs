//! # engine::scheduler
//!
//! One cooperative loop drives everything:
//!
//! ```text
//! loop {
//!     bar sync   (if due)
//!     depth      (if due)
//!     metadata   (if due)
//!     tick cycle (always)
//!     heartbeat  (if due and the fetch did not fail)
//!     sleep      (loop / retry / error backoff)  ◀── Ctrl-C checked here
//! }
//! ```
//!
//! A task is due when `now − last_run ≥ interval`. A late loop makes a task
//! due once; missed intervals are never replayed. Interrupts are only seen
//! during the sleep, so a shutdown never lands in the middle of a batch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::{iso_millis, Clock};
use crate::config::Config;
use crate::models::HeartbeatRecord;
use crate::source::MarketSource;
use crate::state::{BarCursors, IngestState, SharedStatus, StatusSnapshot};
use crate::storage::{DataLayout, LogSet};
use crate::watermark::WatermarkStore;

use super::pipeline::{run_tick_cycle, CycleOutcome};
use super::{tasks, TaskEnv};

// ─── Cadence ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub interval: Duration,
    pub last_run: DateTime<Utc>,
}

impl Cadence {
    pub fn new(interval: Duration, last_run: DateTime<Utc>) -> Self {
        Self { interval, last_run }
    }

    /// A clock that went backwards is "not due yet".
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_run)
            .to_std()
            .map(|elapsed| elapsed >= self.interval)
            .unwrap_or(false)
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_run = now;
    }
}

/// Last-run stamps of the periodic tasks. The tick cycle has none: it runs
/// every iteration.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub bar_sync:  Cadence,
    pub depth:     Cadence,
    pub metadata:  Cadence,
    pub heartbeat: Cadence,
}

impl Schedule {
    /// Everything stamped `now`: the first periodic run is one full interval
    /// after start.
    pub fn new(config: &Config, now: DateTime<Utc>) -> Self {
        Self {
            bar_sync:  Cadence::new(config.bar_sync_interval, now),
            depth:     Cadence::new(config.depth_interval, now),
            metadata:  Cadence::new(config.metadata_interval, now),
            heartbeat: Cadence::new(config.heartbeat_interval, now),
        }
    }
}

// ─── Iteration Report ─────────────────────────────────────────────────────────

/// What ran in one iteration. `None` means "not due".
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub bars:      Option<usize>,
    pub depth:     Option<usize>,
    pub metadata:  Option<bool>,
    pub tick:      CycleOutcome,
    pub heartbeat: Option<HeartbeatRecord>,
}

// ─── Scheduler ────────────────────────────────────────────────────────────────

pub struct Scheduler {
    source: Arc<dyn MarketSource>,
    clock:  Arc<dyn Clock>,
    logs:   LogSet,
    store:  WatermarkStore,
    config: Config,
    state:  IngestState,
    status: watch::Sender<StatusSnapshot>,
}

impl Scheduler {
    /// Connect, then bootstrap. A refused connection is the one fatal
    /// startup error: nothing is fetched and nothing is written.
    pub async fn start(config: Config, source: Arc<dyn MarketSource>, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        source
            .connect()
            .await
            .with_context(|| format!("Failed to connect to market source '{}'", source.name()))?;
        info!(source = source.name(), "[INIT] Connected");

        Ok(Self::bootstrap(config, source, clock).await)
    }

    /// Everything between a successful `connect()` and the first loop
    /// iteration: one metadata row, one full bar sync, then resume the tick
    /// stream from the stored watermark.
    pub async fn bootstrap(config: Config, source: Arc<dyn MarketSource>, clock: Arc<dyn Clock>) -> Self {
        let layout = DataLayout::new(&config.data_dir, &config.symbol);
        let logs = LogSet::new(&layout, &config.timeframes);
        let store = WatermarkStore::new(layout.state_file());
        let mut cursors = BarCursors::default();

        {
            let env = TaskEnv {
                source: source.as_ref(),
                clock:  clock.as_ref(),
                logs:   &logs,
                store:  &store,
                config: &config,
            };

            if let Err(e) = tasks::refresh_metadata(&env).await {
                warn!(error = %e, "[INIT] Initial metadata fetch failed");
            }
            let bars = tasks::sync_bars(&env, &mut cursors).await;
            info!(bars, timeframes = config.timeframes.len(), "[INIT] Initial bar sync done");
        }

        let now = clock.now();
        let watermark = store.load(now);
        info!(
            resume_from = %iso_millis(watermark.last_tick_time),
            state_file  = %store.path().display(),
            "[INIT] Resuming tick stream"
        );

        let mut state = IngestState::new(watermark, config.max_fails, Schedule::new(&config, now));
        state.bar_cursors = cursors;

        let snapshot = StatusSnapshot::initial(&config.symbol, source.name(), &state, now);
        let (status, _) = watch::channel(snapshot);

        Self { source, clock, logs, store, config, state, status }
    }

    #[cfg(test)]
    pub fn state(&self) -> &IngestState {
        &self.state
    }

    pub fn subscribe(&self) -> SharedStatus {
        self.status.subscribe()
    }

    /// Borrow the read-only collaborators and the mutable state separately.
    fn parts(&mut self) -> (TaskEnv<'_>, &mut IngestState) {
        let env = TaskEnv {
            source: self.source.as_ref(),
            clock:  self.clock.as_ref(),
            logs:   &self.logs,
            store:  &self.store,
            config: &self.config,
        };
        (env, &mut self.state)
    }

    pub async fn run_iteration(&mut self) -> IterationReport {
        let now = self.clock.now();
        let (env, state) = self.parts();

        // ── 1. Bars ───────────────────────────────────────────────────────────
        let bars = if state.schedule.bar_sync.is_due(now) {
            let n = tasks::sync_bars(&env, &mut state.bar_cursors).await;
            state.schedule.bar_sync.mark(now);
            Some(n)
        } else {
            None
        };

        // ── 2. Depth ──────────────────────────────────────────────────────────
        let depth = if state.schedule.depth.is_due(now) {
            let n = match tasks::snapshot_depth(&env, &mut state.depth).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "[DEPTH] Snapshot failed");
                    0
                }
            };
            state.schedule.depth.mark(now);
            Some(n)
        } else {
            None
        };

        // ── 3. Metadata ───────────────────────────────────────────────────────
        let metadata = if state.schedule.metadata.is_due(now) {
            let logged = match tasks::refresh_metadata(&env).await {
                Ok(logged) => logged,
                Err(e) => {
                    warn!(error = %e, "[META] Refresh failed");
                    false
                }
            };
            state.schedule.metadata.mark(now);
            Some(logged)
        } else {
            None
        };

        // ── 4. Ticks ──────────────────────────────────────────────────────────
        let tick = run_tick_cycle(&env, state).await;

        // ── 5. Heartbeat ──────────────────────────────────────────────────────
        let heartbeat = if !tick.fetch_failed() && state.schedule.heartbeat.is_due(now) {
            let record = tasks::write_heartbeat(&env, state);
            state.schedule.heartbeat.mark(now);
            Some(record)
        } else {
            None
        };

        let published_at = self.clock.now();
        self.status
            .send_modify(|snap| snap.refresh(&self.state, heartbeat.as_ref(), published_at));

        IterationReport { bars, depth, metadata, tick, heartbeat }
    }

    /// Sleep that follows an iteration with this tick outcome.
    pub fn delay_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            o if o.fetch_failed() => self.config.retry_backoff,
            CycleOutcome::Faulted { .. } => self.config.error_backoff,
            _ => self.config.loop_sleep,
        }
    }

    /// Run until `shutdown` resolves, then persist and disconnect.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            symbol = %self.config.symbol,
            source = self.source.name(),
            "[INIT] Ingestion loop running — Ctrl+C to stop"
        );

        loop {
            let report = self.run_iteration().await;
            let delay = self.delay_after(&report.tick);

            if let CycleOutcome::Faulted { phase, reason } = &report.tick {
                warn!(
                    phase      = %phase,
                    reason     = %reason,
                    backoff_ms = delay.as_millis() as u64,
                    "[LOOP] Tick cycle faulted"
                );
            }
            debug!(
                bars      = ?report.bars,
                depth     = ?report.depth,
                metadata  = ?report.metadata,
                heartbeat = report.heartbeat.is_some(),
                tick      = ?report.tick,
                "[LOOP] Iteration done"
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("[SHUTDOWN] Interrupt received");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shutdown().await;
    }

    /// Persist the in-memory watermark and release the source.
    pub async fn shutdown(&mut self) {
        let now = self.clock.now();
        let watermark = self.state.watermark.last_tick_time;
        if self.store.save(watermark, now) {
            info!(watermark = %iso_millis(watermark), total_ticks = self.state.total_ticks, "[SHUTDOWN] State saved");
        }
        self.source.disconnect().await;
        info!(source = self.source.name(), "[SHUTDOWN] Disconnected");
    }
}
