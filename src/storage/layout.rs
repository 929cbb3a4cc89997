//! # storage::layout
//!
//! Where every stream lives on disk, and the bundle of [`AppendLog`]s the
//! scheduler writes through.
//!
//! ```text
//! <root>/
//!   ticks/<SYMBOL>/<symbol>_ticks_raw.csv
//!   ticks/<SYMBOL>/state.json
//!   ohlcv/<SYMBOL>/<TF>.csv
//!   dom/<SYMBOL>/dom_snapshots.csv
//!   metadata/symbol_info.csv
//!   metadata/session_log.csv
//!   metadata/heartbeat.csv
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::Timeframe;

use super::csv::AppendLog;

#[derive(Debug, Clone)]
pub struct DataLayout {
    root:   PathBuf,
    symbol: String,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, symbol: &str) -> Self {
        Self { root: root.into(), symbol: symbol.to_string() }
    }

    pub fn tick_dir(&self) -> PathBuf {
        self.root.join("ticks").join(&self.symbol)
    }

    pub fn ohlcv_dir(&self) -> PathBuf {
        self.root.join("ohlcv").join(&self.symbol)
    }

    pub fn dom_dir(&self) -> PathBuf {
        self.root.join("dom").join(&self.symbol)
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    pub fn tick_csv(&self) -> PathBuf {
        self.tick_dir()
            .join(format!("{}_ticks_raw.csv", self.symbol.to_lowercase()))
    }

    pub fn state_file(&self) -> PathBuf {
        self.tick_dir().join("state.json")
    }

    pub fn bar_csv(&self, tf: Timeframe) -> PathBuf {
        self.ohlcv_dir().join(format!("{tf}.csv"))
    }

    pub fn dom_csv(&self) -> PathBuf {
        self.dom_dir().join("dom_snapshots.csv")
    }

    pub fn meta_csv(&self) -> PathBuf {
        self.meta_dir().join("symbol_info.csv")
    }

    pub fn session_csv(&self) -> PathBuf {
        self.meta_dir().join("session_log.csv")
    }

    pub fn heartbeat_csv(&self) -> PathBuf {
        self.meta_dir().join("heartbeat.csv")
    }

    pub fn create_dirs(&self) -> Result<(), StoreError> {
        for dir in [self.tick_dir(), self.ohlcv_dir(), self.dom_dir(), self.meta_dir()] {
            fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(())
    }
}

// ─── LogSet ───────────────────────────────────────────────────────────────────

/// One independent destination per stream.
#[derive(Debug, Clone)]
pub struct LogSet {
    pub ticks:     AppendLog,
    pub bars:      BTreeMap<Timeframe, AppendLog>,
    pub depth:     AppendLog,
    pub metadata:  AppendLog,
    pub sessions:  AppendLog,
    pub heartbeat: AppendLog,
    ohlcv_dir:     PathBuf,
}

impl LogSet {
    pub fn new(layout: &DataLayout, timeframes: &[Timeframe]) -> Self {
        Self {
            ticks:     AppendLog::new(layout.tick_csv()),
            bars:      timeframes
                .iter()
                .map(|&tf| (tf, AppendLog::new(layout.bar_csv(tf))))
                .collect(),
            depth:     AppendLog::new(layout.dom_csv()),
            metadata:  AppendLog::new(layout.meta_csv()),
            sessions:  AppendLog::new(layout.session_csv()),
            heartbeat: AppendLog::new(layout.heartbeat_csv()),
            ohlcv_dir: layout.ohlcv_dir(),
        }
    }

    pub fn ohlcv_dir(&self) -> &Path {
        &self.ohlcv_dir
    }
}
