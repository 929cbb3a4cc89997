//! # engine
//!
//! The ingestion loop and the periodic tasks it drives.
//!
//! * [`pipeline`] — one tick cycle: fetch → dedup → enrich → append → advance.
//! * [`tasks`] — bar sync, depth snapshot, metadata refresh, heartbeat.
//! * [`retry`] — consecutive-failure budget for the tick fetch.
//! * [`scheduler`] — cadences, iteration order, sleep and shutdown.

use crate::clock::Clock;
use crate::config::Config;
use crate::source::MarketSource;
use crate::storage::LogSet;
use crate::watermark::WatermarkStore;

pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod tasks;

/// Read-only collaborators every task needs. Mutable loop state travels
/// separately as `&mut IngestState`.
#[derive(Clone, Copy)]
pub struct TaskEnv<'a> {
    pub source: &'a dyn MarketSource,
    pub clock:  &'a dyn Clock,
    pub logs:   &'a LogSet,
    pub store:  &'a WatermarkStore,
    pub config: &'a Config,
}

#[cfg(test)]
pub(crate) mod testkit;
