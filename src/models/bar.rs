//! # models::bar
//!
//! OHLCV bars and the timeframes we keep a log for.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::CsvRecord;

// ─── Timeframe ────────────────────────────────────────────────────────────────

/// Bar timeframes supported by MT5 that we synchronise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::M1  => "M1",
            Timeframe::M5  => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1  => "H1",
            Timeframe::H4  => "H4",
            Timeframe::D1  => "D1",
            Timeframe::W1  => "W1",
            Timeframe::MN1 => "MN1",
        }
    }

    /// How many bars (counted back from the forming bar) each sync requests.
    pub fn lookback(self) -> usize {
        match self {
            Timeframe::W1  => 200,
            Timeframe::MN1 => 100,
            _              => 500,
        }
    }

    /// Nominal bar length. MN1 is approximated as 30 days.
    pub fn period_secs(self) -> i64 {
        match self {
            Timeframe::M1  => 60,
            Timeframe::M5  => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1  => 3_600,
            Timeframe::H4  => 4 * 3_600,
            Timeframe::D1  => 86_400,
            Timeframe::W1  => 7 * 86_400,
            Timeframe::MN1 => 30 * 86_400,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label() == wanted)
            .ok_or_else(|| format!("unknown timeframe '{s}'"))
    }
}

// ─── Bar ──────────────────────────────────────────────────────────────────────

/// One OHLCV bar as returned by `copy_rates_from_pos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time, seconds since the Unix epoch.
    #[serde(alias = "time")]
    pub period_start: i64,
    pub open:         f64,
    pub high:         f64,
    pub low:          f64,
    pub close:        f64,
    #[serde(default)]
    pub tick_volume:  u64,
    #[serde(default)]
    pub real_volume:  f64,
    #[serde(default)]
    pub spread:       i64,
}

impl Bar {
    pub fn time_dt(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.period_start, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_default()
    }
}

impl CsvRecord for Bar {
    const HEADER: &'static [&'static str] = &[
        "period_start", "time_dt", "open", "high", "low", "close",
        "tick_volume", "real_volume", "spread",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.period_start.to_string(),
            self.time_dt(),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.tick_volume.to_string(),
            self.real_volume.to_string(),
            self.spread.to_string(),
        ]
    }
}
