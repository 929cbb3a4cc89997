//! # models::tick
//!
//! [`RawTick`] is the quote record exactly as the MT5 bridge returns it (it
//! mirrors the MQL5 `MqlTick` structure). [`EnrichedTick`] is what lands in the
//! tick log: the raw fields plus derived pricing and session columns.

use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::storage::CsvRecord;

/// A single quote as delivered by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTick {
    /// Milliseconds since the Unix epoch (broker server time, UTC).
    pub time_msc: i64,

    pub bid: f64,
    pub ask: f64,

    /// Last deal price (0 for pure quote feeds like spot gold).
    #[serde(default)]
    pub last: f64,

    #[serde(default)]
    pub volume: u64,

    /// Some brokers never fill this in, so it defaults to 0.
    #[serde(default)]
    pub volume_real: f64,

    /// `TICK_FLAG_*` bitmask.
    #[serde(default)]
    pub flags: u32,
}

/// A [`RawTick`] plus the derived columns written to the tick log.
///
/// Built once by [`crate::enrich::enrich_ticks`] and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTick {
    pub time_msc:          i64,
    /// RFC 3339 UTC, millisecond precision.
    pub time_dt:           String,
    pub bid:               f64,
    pub ask:               f64,
    pub last:              f64,
    pub volume:            u64,
    pub volume_real:       f64,
    pub flags:             u32,
    pub flag_desc:         String,
    /// `ask − bid`, 5 dp.
    pub spread:            f64,
    /// `(ask − bid) / bid × 100`, 6 dp. `None` when `bid == 0`.
    pub spread_pct:        Option<f64>,
    /// `(bid + ask) / 2`, 5 dp.
    pub mid:               f64,
    /// `bid / ask`, 6 dp. `None` when `ask == 0`.
    pub bid_ask_imbalance: Option<f64>,
    pub session:           Session,
    pub day_of_week:       String,
    pub hour_utc:          u32,
}

impl CsvRecord for EnrichedTick {
    const HEADER: &'static [&'static str] = &[
        "time_msc", "time_dt",
        "bid", "ask", "last",
        "volume", "volume_real",
        "flags", "flag_desc",
        "spread", "spread_pct", "mid", "bid_ask_imbalance",
        "session", "day_of_week", "hour_utc",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.time_msc.to_string(),
            self.time_dt.clone(),
            self.bid.to_string(),
            self.ask.to_string(),
            self.last.to_string(),
            self.volume.to_string(),
            self.volume_real.to_string(),
            self.flags.to_string(),
            self.flag_desc.clone(),
            self.spread.to_string(),
            self.spread_pct.map(|v| v.to_string()).unwrap_or_default(),
            self.mid.to_string(),
            self.bid_ask_imbalance.map(|v| v.to_string()).unwrap_or_default(),
            self.session.to_string(),
            self.day_of_week.clone(),
            self.hour_utc.to_string(),
        ]
    }
}
