//! # source::mock
//!
//! Synthetic feed for development without an MT5 terminal. Ticks land on a
//! fixed 200 ms grid so repeated fetches from the same watermark return the
//! same data, which is enough to exercise resume and dedup end to end. The
//! mock broker does not publish depth.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::enrich::{round_dp, TICK_FLAG_ASK, TICK_FLAG_BID};
use crate::error::SourceError;
use crate::models::{Bar, BookEntry, RawTick, SymbolInfo, Timeframe};

use super::MarketSource;

const TICK_SPACING_MS: i64 = 200;
const BASE_PRICE: f64 = 2_350.0;
const HALF_SPREAD: f64 = 0.12;

pub struct MockSource {
    clock:     Arc<dyn Clock>,
    connected: AtomicBool,
}

impl MockSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, connected: AtomicBool::new(false) }
    }

    /// Deterministic mid price for an instant.
    fn mid_at(time_msc: i64) -> f64 {
        let phase = time_msc as f64 / 60_000.0;
        round_dp(BASE_PRICE + 4.0 * phase.sin() + 0.5 * (phase * 7.0).cos(), 2)
    }

    fn ensure_connected(&self) -> Result<(), SourceError> {
        if self.connected.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(SourceError::NotConnected("mock source not connected".into()))
        }
    }
}

#[async_trait::async_trait]
impl MarketSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<(), SourceError> {
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    async fn fetch_ticks(
        &self,
        _symbol: &str,
        since_msc: i64,
        max_count: usize,
    ) -> Result<Vec<RawTick>, SourceError> {
        self.ensure_connected()?;

        let now = self.clock.now_msc();
        // first grid point at or after `since`
        let mut t = since_msc.div_euclid(TICK_SPACING_MS) * TICK_SPACING_MS;
        if t < since_msc {
            t += TICK_SPACING_MS;
        }

        let mut ticks = Vec::new();
        while t <= now && ticks.len() < max_count {
            let mid = Self::mid_at(t);
            ticks.push(RawTick {
                time_msc:    t,
                bid:         round_dp(mid - HALF_SPREAD, 2),
                ask:         round_dp(mid + HALF_SPREAD, 2),
                last:        0.0,
                volume:      0,
                volume_real: 0.0,
                flags:       TICK_FLAG_BID | TICK_FLAG_ASK,
            });
            t += TICK_SPACING_MS;
        }
        Ok(ticks)
    }

    async fn fetch_bars(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, SourceError> {
        self.ensure_connected()?;

        let period = timeframe.period_secs();
        let forming = self.clock.now().timestamp().div_euclid(period) * period;
        let newest = forming - start_pos as i64 * period;

        // oldest first, like copy_rates_from_pos
        let bars = (0..count as i64)
            .rev()
            .map(|back| {
                let start = newest - back * period;
                let open = Self::mid_at(start * 1_000);
                let close = Self::mid_at((start + period) * 1_000);
                Bar {
                    period_start: start,
                    open,
                    high:         round_dp(open.max(close) + 0.8, 2),
                    low:          round_dp(open.min(close) - 0.8, 2),
                    close,
                    tick_volume:  (period / 2) as u64,
                    real_volume:  0.0,
                    spread:       24,
                }
            })
            .collect();
        Ok(bars)
    }

    async fn fetch_depth(&self, _symbol: &str) -> Result<Vec<BookEntry>, SourceError> {
        self.ensure_connected()?;
        Ok(Vec::new())
    }

    async fn fetch_symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, SourceError> {
        self.ensure_connected()?;
        Ok(Some(SymbolInfo {
            name:                Some(symbol.to_string()),
            description:         Some(format!("{symbol} (synthetic)")),
            currency_base:       Some(symbol.chars().take(3).collect()),
            currency_profit:     Some("USD".into()),
            currency_margin:     Some("USD".into()),
            digits:              Some(2),
            point:               Some(0.01),
            trade_tick_size:     Some(0.01),
            trade_tick_value:    Some(1.0),
            trade_contract_size: Some(100.0),
            volume_min:          Some(0.01),
            volume_max:          Some(100.0),
            volume_step:         Some(0.01),
            spread:              Some(24),
            spread_float:        Some(true),
            ..Default::default()
        }))
    }
}
