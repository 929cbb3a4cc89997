//! # engine::tasks
//!
//! The periodic jobs around the tick cycle. Each one is a plain async
//! function over [`TaskEnv`]; the scheduler decides when they run and logs
//! whatever error comes back.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::iso_millis;
use crate::enrich::round_dp;
use crate::error::TaskError;
use crate::models::{Bar, DepthLevel, HeartbeatRecord, MetadataSnapshot, Timeframe};
use crate::session::session_of;
use crate::state::{BarCursors, IngestState};
use crate::storage::dir_csv_bytes;

use super::TaskEnv;

// ─── Bar Sync ─────────────────────────────────────────────────────────────────

/// Sync every configured timeframe; one timeframe failing does not stop the
/// rest. Returns the number of bars written.
pub async fn sync_bars(env: &TaskEnv<'_>, cursors: &mut BarCursors) -> usize {
    let mut written = 0;
    for &tf in &env.config.timeframes {
        match sync_timeframe(env, tf, cursors).await {
            Ok(n) => written += n,
            Err(e) => warn!(timeframe = %tf, error = %e, "[BARS] Sync failed"),
        }
    }
    if written > 0 {
        debug!(bars = written, "[BARS] Synced");
    }
    written
}

/// Fetch the lookback window and append bars newer than the cursor. The
/// cursor then moves to the newest period start seen, so the forming bar is
/// written once with whatever values it had at that moment.
pub async fn sync_timeframe(
    env: &TaskEnv<'_>,
    tf: Timeframe,
    cursors: &mut BarCursors,
) -> Result<usize, TaskError> {
    let Some(log) = env.logs.bars.get(&tf) else {
        return Ok(0);
    };

    let bars = env
        .source
        .fetch_bars(&env.config.symbol, tf, 0, tf.lookback())
        .await?;
    let Some(newest) = bars.iter().map(|b| b.period_start).max() else {
        return Ok(0);
    };

    let cursor = cursors.get(tf);
    let fresh: Vec<Bar> = bars.into_iter().filter(|b| b.period_start > cursor).collect();
    log.append(&fresh)?;
    cursors.advance(tf, newest);
    Ok(fresh.len())
}

// ─── Depth Snapshot ───────────────────────────────────────────────────────────

/// Whether the broker publishes market depth. Decided by the first answer
/// and never revisited during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepthCapability {
    Unknown,
    Supported,
    Unsupported,
}

/// Append one snapshot (all levels share a timestamp). Once the broker has
/// been found not to publish depth, this returns without calling upstream.
pub async fn snapshot_depth(env: &TaskEnv<'_>, capability: &mut DepthCapability) -> Result<usize, TaskError> {
    if *capability == DepthCapability::Unsupported {
        return Ok(0);
    }

    let book = env.source.fetch_depth(&env.config.symbol).await?;
    if book.is_empty() {
        if *capability == DepthCapability::Unknown {
            *capability = DepthCapability::Unsupported;
            info!(symbol = %env.config.symbol, "[DEPTH] Broker publishes no depth — snapshots off for this run");
        }
        return Ok(0);
    }

    if *capability == DepthCapability::Unknown {
        *capability = DepthCapability::Supported;
        info!(symbol = %env.config.symbol, levels = book.len(), "[DEPTH] Depth available");
    }

    let levels = DepthLevel::snapshot(env.clock.now_msc(), &book);
    env.logs.depth.append(&levels)?;
    Ok(levels.len())
}

// ─── Metadata ─────────────────────────────────────────────────────────────────

/// Append one contract-spec row. An unknown symbol is a quiet no-op.
pub async fn refresh_metadata(env: &TaskEnv<'_>) -> Result<bool, TaskError> {
    let Some(info) = env.source.fetch_symbol_info(&env.config.symbol).await? else {
        debug!(symbol = %env.config.symbol, "[META] No symbol info");
        return Ok(false);
    };

    let snapshot = MetadataSnapshot { logged_at: env.clock.now(), info };
    env.logs.metadata.append(std::slice::from_ref(&snapshot))?;
    info!(
        symbol = %env.config.symbol,
        spread = ?snapshot.info.spread,
        digits = ?snapshot.info.digits,
        "[META] Symbol info logged"
    );
    Ok(true)
}

// ─── Heartbeat ────────────────────────────────────────────────────────────────

const MIB: f64 = 1_048_576.0;

fn mib(bytes: u64) -> f64 {
    round_dp(bytes as f64 / MIB, 3)
}

/// Recompute the summary from scratch. Never fails: missing files count as
/// zero and a failed append is only a warning.
pub fn write_heartbeat(env: &TaskEnv<'_>, state: &IngestState) -> HeartbeatRecord {
    let now = env.clock.now();
    let watermark = state.watermark.last_tick_time;

    let record = HeartbeatRecord {
        time_dt:       now.to_rfc3339(),
        watermark_msc: watermark,
        watermark_dt:  iso_millis(watermark),
        batch_size:    state.last_batch,
        total_ticks:   state.total_ticks,
        tick_mb:       mib(env.logs.ticks.size_bytes()),
        ohlcv_mb:      mib(dir_csv_bytes(env.logs.ohlcv_dir())),
        dom_mb:        mib(env.logs.depth.size_bytes()),
        session:       session_of(now),
    };

    info!(
        watermark = %record.watermark_dt,
        batch     = record.batch_size,
        total     = record.total_ticks,
        tick_mb   = record.tick_mb,
        ohlcv_mb  = record.ohlcv_mb,
        dom_mb    = record.dom_mb,
        session   = %record.session,
        "[HEARTBEAT]"
    );

    if let Err(e) = env.logs.heartbeat.append(std::slice::from_ref(&record)) {
        warn!(error = %e, "[HEARTBEAT] Failed to write heartbeat");
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testkit::{Fixture, T0};
    use crate::models::depth::BookSide;
    use crate::models::{BookEntry, SymbolInfo};
    use crate::session::Session;
    use crate::source::scripted::ScriptedSource;

    fn bar(period_start: i64, close: f64) -> Bar {
        Bar {
            period_start,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            tick_volume: 10,
            real_volume: 0.0,
            spread: 20,
        }
    }

    fn entry(side: BookSide, price: f64) -> BookEntry {
        BookEntry { side, price, volume: 1.0 }
    }

    #[tokio::test]
    async fn test_bar_sync_writes_only_new_bars() {
        let fx = Fixture::new();
        let mut cursors = BarCursors::default();
        fx.source.set_bars(Timeframe::M1, vec![bar(60, 1.0), bar(120, 2.0), bar(180, 3.0)]);

        assert_eq!(sync_bars(&fx.env(), &mut cursors).await, 3);
        assert_eq!(cursors.get(Timeframe::M1), 180);

        // overlapping window: 180 is known, 240 is new
        fx.source.set_bars(Timeframe::M1, vec![bar(120, 2.0), bar(180, 3.5), bar(240, 4.0)]);
        assert_eq!(sync_bars(&fx.env(), &mut cursors).await, 1);
        assert_eq!(cursors.get(Timeframe::M1), 240);

        let rows = Fixture::rows(&fx.layout.bar_csv(Timeframe::M1));
        assert_eq!(rows.len(), 4);
        assert!(rows[3].starts_with("240,"));

        // H1 had no data and no file was created
        assert!(!fx.layout.bar_csv(Timeframe::H1).exists());
    }

    #[tokio::test]
    async fn test_bar_sync_only_configured_timeframes() {
        let fx = Fixture::new();
        let mut cursors = BarCursors::default();
        fx.source.set_bars(Timeframe::D1, vec![bar(86_400, 1.0)]);

        assert_eq!(sync_bars(&fx.env(), &mut cursors).await, 0);
        // M1 and H1 only
        assert_eq!(ScriptedSource::count(&fx.source.bar_calls), 2);
    }

    #[tokio::test]
    async fn test_depth_unsupported_is_sticky() {
        let fx = Fixture::new();
        let mut cap = DepthCapability::Unknown;

        assert_eq!(snapshot_depth(&fx.env(), &mut cap).await.unwrap(), 0);
        assert_eq!(cap, DepthCapability::Unsupported);

        fx.source.push_depth(vec![entry(BookSide::Bid, 1900.0)]);
        for _ in 0..3 {
            assert_eq!(snapshot_depth(&fx.env(), &mut cap).await.unwrap(), 0);
        }
        assert_eq!(ScriptedSource::count(&fx.source.depth_calls), 1);
        assert!(!fx.layout.dom_csv().exists());
    }

    #[tokio::test]
    async fn test_depth_supported_snapshot_shares_timestamp() {
        let fx = Fixture::new();
        let mut cap = DepthCapability::Unknown;
        fx.source
            .push_depth(vec![entry(BookSide::Ask, 1900.5), entry(BookSide::Bid, 1900.2)])
            .push_depth(Vec::new());

        assert_eq!(snapshot_depth(&fx.env(), &mut cap).await.unwrap(), 2);
        assert_eq!(cap, DepthCapability::Supported);

        // an empty book later on does not demote the capability
        assert_eq!(snapshot_depth(&fx.env(), &mut cap).await.unwrap(), 0);
        assert_eq!(cap, DepthCapability::Supported);

        let rows = Fixture::rows(&fx.layout.dom_csv());
        assert_eq!(rows.len(), 2);
        let stamp = format!("{T0},");
        assert!(rows.iter().all(|r| r.starts_with(&stamp)));
    }

    #[tokio::test]
    async fn test_metadata_absent_is_noop() {
        let fx = Fixture::new();
        assert!(!refresh_metadata(&fx.env()).await.unwrap());
        assert!(!fx.layout.meta_csv().exists());

        fx.source.set_info(Some(SymbolInfo {
            name: Some("XAUUSD".into()),
            digits: Some(2),
            ..Default::default()
        }));
        assert!(refresh_metadata(&fx.env()).await.unwrap());
        assert_eq!(Fixture::rows(&fx.layout.meta_csv()).len(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_with_missing_files() {
        let fx = Fixture::new();
        let mut state = fx.state(T0 - 2_000);
        state.total_ticks = 42;
        state.last_batch = 7;

        let hb = write_heartbeat(&fx.env(), &state);
        assert_eq!(hb.total_ticks, 42);
        assert_eq!(hb.batch_size, 7);
        assert_eq!(hb.tick_mb, 0.0);
        assert_eq!(hb.ohlcv_mb, 0.0);
        assert_eq!(hb.dom_mb, 0.0);
        assert_eq!(hb.session, Session::LondonNyOverlap);
        assert_eq!(Fixture::rows(&fx.layout.heartbeat_csv()).len(), 1);
    }

    #[test]
    fn test_mib_rounding() {
        assert_eq!(mib(0), 0.0);
        assert_eq!(mib(1_048_576), 1.0);
        assert_eq!(mib(1_572_864), 1.5);
        assert_eq!(mib(1_000), 0.001);
    }
}
