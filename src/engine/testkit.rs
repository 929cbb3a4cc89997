//! Shared fixture for engine tests: temp data dir, manual clock, scripted source.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use crate::clock::{msc_to_dt, ManualClock};
use crate::config::Config;
use crate::models::{RawTick, Timeframe};
use crate::source::scripted::ScriptedSource;
use crate::state::IngestState;
use crate::storage::{DataLayout, LogSet};
use crate::watermark::{Watermark, WatermarkStore};

use super::scheduler::Schedule;
use super::TaskEnv;

/// 2024-01-01 13:00:00 UTC, a Monday inside the London/NY overlap.
pub const T0: i64 = 1_704_114_000_000;

pub fn tick(time_msc: i64, bid: f64, ask: f64) -> RawTick {
    RawTick { time_msc, bid, ask, last: 0.0, volume: 0, volume_real: 0.0, flags: 6 }
}

pub struct Fixture {
    _dir:       TempDir,
    pub clock:  Arc<ManualClock>,
    pub source: Arc<ScriptedSource>,
    pub config: Config,
    pub layout: DataLayout,
    pub logs:   LogSet,
    pub store:  WatermarkStore,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir:   dir.path().to_path_buf(),
            timeframes: vec![Timeframe::M1, Timeframe::H1],
            ..Config::default()
        };
        let layout = DataLayout::new(&config.data_dir, &config.symbol);
        layout.create_dirs().unwrap();

        Self {
            logs:   LogSet::new(&layout, &config.timeframes),
            store:  WatermarkStore::new(layout.state_file()),
            clock:  Arc::new(ManualClock::at(msc_to_dt(T0))),
            source: Arc::new(ScriptedSource::new()),
            config,
            layout,
            _dir:   dir,
        }
    }

    pub fn env(&self) -> TaskEnv<'_> {
        TaskEnv {
            source: self.source.as_ref(),
            clock:  self.clock.as_ref(),
            logs:   &self.logs,
            store:  &self.store,
            config: &self.config,
        }
    }

    pub fn state(&self, watermark_msc: i64) -> IngestState {
        let now = msc_to_dt(T0);
        IngestState::new(
            Watermark::new(watermark_msc, now),
            self.config.max_fails,
            Schedule::new(&self.config, now),
        )
    }

    /// Data lines (header excluded) of a CSV; a missing file is empty.
    pub fn rows(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .map(|text| text.lines().skip(1).map(str::to_string).collect())
            .unwrap_or_default()
    }
}
