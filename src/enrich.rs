//! # enrich
//!
//! Raw quotes → tick-log rows. Pure and batch oriented; an empty batch comes
//! back empty. Division by a zero `bid`/`ask` yields `None` for that column
//! instead of failing the batch.

use chrono::Timelike;

use crate::clock::{iso_millis, msc_to_dt};
use crate::models::{EnrichedTick, RawTick};
use crate::session::session_of;

// ─── Tick Flags ───────────────────────────────────────────────────────────────

pub const TICK_FLAG_BID:    u32 = 0x02;
pub const TICK_FLAG_ASK:    u32 = 0x04;
pub const TICK_FLAG_LAST:   u32 = 0x08;
pub const TICK_FLAG_VOLUME: u32 = 0x10;
pub const TICK_FLAG_BUY:    u32 = 0x20;
pub const TICK_FLAG_SELL:   u32 = 0x40;

const FLAG_NAMES: [(u32, &str); 6] = [
    (TICK_FLAG_BID, "BID"),
    (TICK_FLAG_ASK, "ASK"),
    (TICK_FLAG_LAST, "LAST"),
    (TICK_FLAG_VOLUME, "VOLUME"),
    (TICK_FLAG_BUY, "BUY"),
    (TICK_FLAG_SELL, "SELL"),
];

/// `0x06` → `"BID|ASK"`, `0` → `"TICK"`.
pub fn flag_description(flags: u32) -> String {
    let parts: Vec<&str> = FLAG_NAMES
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();

    if parts.is_empty() {
        "TICK".to_string()
    } else {
        parts.join("|")
    }
}

/// Round to `dp` decimal places, ties to even (banker's rounding).
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (value * scale).round_ties_even() / scale
}

// ─── Enrichment ───────────────────────────────────────────────────────────────

pub fn enrich_tick(tick: &RawTick) -> EnrichedTick {
    let dt = msc_to_dt(tick.time_msc);

    let spread_pct = (tick.bid != 0.0)
        .then(|| round_dp((tick.ask - tick.bid) / tick.bid * 100.0, 6));
    let bid_ask_imbalance = (tick.ask != 0.0)
        .then(|| round_dp(tick.bid / tick.ask, 6));

    EnrichedTick {
        time_msc:    tick.time_msc,
        time_dt:     iso_millis(tick.time_msc),
        bid:         tick.bid,
        ask:         tick.ask,
        last:        tick.last,
        volume:      tick.volume,
        volume_real: tick.volume_real,
        flags:       tick.flags,
        flag_desc:   flag_description(tick.flags),
        spread:      round_dp(tick.ask - tick.bid, 5),
        spread_pct,
        mid:         round_dp((tick.bid + tick.ask) / 2.0, 5),
        bid_ask_imbalance,
        session:     session_of(dt),
        day_of_week: dt.format("%A").to_string(),
        hour_utc:    dt.hour(),
    }
}

pub fn enrich_ticks(ticks: &[RawTick]) -> Vec<EnrichedTick> {
    ticks.iter().map(enrich_tick).collect()
}
