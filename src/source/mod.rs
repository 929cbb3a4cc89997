//! # source
//!
//! The upstream seam. Everything the logger needs from the trading terminal
//! goes through [`MarketSource`]; the scheduler never knows whether it is
//! talking to a real MT5 bridge or the mock.
//!
//! ## Implementations
//! * [`bridge::BridgeSource`] — HTTP/JSON bridge in front of the MT5 terminal.
//! * [`mock::MockSource`] — synthetic feed, selected with `MT5_BRIDGE_URL=mock`.

use std::sync::Arc;

use anyhow::Context;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::SourceError;
use crate::models::{Bar, BookEntry, RawTick, SymbolInfo, Timeframe};

pub mod bridge;
pub mod mock;

#[cfg(test)]
pub mod scripted;

#[async_trait::async_trait]
pub trait MarketSource: Send + Sync {
    /// Short name for logs, e.g. `"mt5-bridge"`.
    fn name(&self) -> &str;

    /// Establish the upstream session. A failure here is fatal at startup.
    async fn connect(&self) -> Result<(), SourceError>;

    /// Release the upstream session. Best effort.
    async fn disconnect(&self);

    /// Up to `max_count` ticks with `time_msc >= since_msc`, oldest first.
    async fn fetch_ticks(
        &self,
        symbol: &str,
        since_msc: i64,
        max_count: usize,
    ) -> Result<Vec<RawTick>, SourceError>;

    /// `count` bars counted back from position `start_pos` (0 = forming bar).
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, SourceError>;

    /// Current order book. Empty when the broker does not publish depth.
    async fn fetch_depth(&self, symbol: &str) -> Result<Vec<BookEntry>, SourceError>;

    /// Contract specification, `None` when the symbol is unknown.
    async fn fetch_symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, SourceError>;
}

/// Pick the source implementation from `MT5_BRIDGE_URL`.
pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<dyn MarketSource>> {
    if config.bridge_url.eq_ignore_ascii_case("mock") {
        tracing::warn!("MT5_BRIDGE_URL=mock — using SYNTHETIC market data");
        return Ok(Arc::new(mock::MockSource::new(clock)));
    }

    let bridge = bridge::BridgeSource::new(&config.bridge_url, config.request_timeout)
        .context("Failed to build MT5 bridge client")?;
    Ok(Arc::new(bridge))
}
