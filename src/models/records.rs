//! # models::records
//!
//! Bookkeeping rows the logger writes about itself: session transitions and
//! heartbeats.

use serde::Serialize;

use crate::session::Session;
use crate::storage::CsvRecord;

/// Written only when the session label changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub time_dt:          String,
    pub session:          Session,
    /// `None` for the first observation of the run.
    pub previous_session: Option<Session>,
    pub weekday:          String,
}

impl CsvRecord for SessionEvent {
    const HEADER: &'static [&'static str] = &["time_dt", "session", "previous_session", "weekday"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.time_dt.clone(),
            self.session.to_string(),
            self.previous_session.map(|s| s.to_string()).unwrap_or_default(),
            self.weekday.clone(),
        ]
    }
}

/// Derived summary, recomputed every heartbeat. Nothing reads it back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatRecord {
    pub time_dt:       String,
    pub watermark_msc: i64,
    pub watermark_dt:  String,
    pub batch_size:    usize,
    pub total_ticks:   u64,
    pub tick_mb:       f64,
    pub ohlcv_mb:      f64,
    pub dom_mb:        f64,
    pub session:       Session,
}

impl CsvRecord for HeartbeatRecord {
    const HEADER: &'static [&'static str] = &[
        "time_dt", "watermark_msc", "watermark_dt", "batch_size", "total_ticks",
        "tick_mb", "ohlcv_mb", "dom_mb", "session",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.time_dt.clone(),
            self.watermark_msc.to_string(),
            self.watermark_dt.clone(),
            self.batch_size.to_string(),
            self.total_ticks.to_string(),
            self.tick_mb.to_string(),
            self.ohlcv_mb.to_string(),
            self.dom_mb.to_string(),
            self.session.to_string(),
        ]
    }
}
