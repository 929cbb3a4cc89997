//! Test-only [`MarketSource`] that replays queued responses and counts calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::SourceError;
use crate::models::{Bar, BookEntry, RawTick, SymbolInfo, Timeframe};

use super::MarketSource;

#[derive(Default)]
pub struct ScriptedSource {
    ticks:           Mutex<VecDeque<Result<Vec<RawTick>, SourceError>>>,
    bars:            Mutex<HashMap<Timeframe, Vec<Bar>>>,
    depth:           Mutex<VecDeque<Vec<BookEntry>>>,
    info:            Mutex<Option<SymbolInfo>>,
    refuse_connect:  AtomicBool,
    pub since_seen:  Mutex<Vec<i64>>,
    /// Every fetch, in call order: `"ticks"`, `"bars"`, `"depth"`, `"info"`.
    pub calls:       Mutex<Vec<&'static str>>,
    pub tick_calls:  AtomicUsize,
    pub bar_calls:   AtomicUsize,
    pub depth_calls: AtomicUsize,
    pub info_calls:  AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ticks(&self, ticks: Vec<RawTick>) -> &Self {
        self.ticks.lock().unwrap().push_back(Ok(ticks));
        self
    }

    pub fn push_tick_error(&self) -> &Self {
        self.ticks
            .lock()
            .unwrap()
            .push_back(Err(SourceError::Transport("connection reset".into())));
        self
    }

    pub fn set_bars(&self, tf: Timeframe, bars: Vec<Bar>) -> &Self {
        self.bars.lock().unwrap().insert(tf, bars);
        self
    }

    pub fn push_depth(&self, book: Vec<BookEntry>) -> &Self {
        self.depth.lock().unwrap().push_back(book);
        self
    }

    pub fn set_info(&self, info: Option<SymbolInfo>) -> &Self {
        *self.info.lock().unwrap() = info;
        self
    }

    pub fn refuse_connect(&self) -> &Self {
        self.refuse_connect.store(true, Ordering::SeqCst);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn record(&self, call: &'static str, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl MarketSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(&self) -> Result<(), SourceError> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            Err(SourceError::NotConnected("scripted refusal".into()))
        } else {
            Ok(())
        }
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn fetch_ticks(
        &self,
        _symbol: &str,
        since_msc: i64,
        _max_count: usize,
    ) -> Result<Vec<RawTick>, SourceError> {
        self.record("ticks", &self.tick_calls);
        self.since_seen.lock().unwrap().push(since_msc);
        self.ticks.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_bars(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        _start_pos: usize,
        _count: usize,
    ) -> Result<Vec<Bar>, SourceError> {
        self.record("bars", &self.bar_calls);
        Ok(self.bars.lock().unwrap().get(&timeframe).cloned().unwrap_or_default())
    }

    async fn fetch_depth(&self, _symbol: &str) -> Result<Vec<BookEntry>, SourceError> {
        self.record("depth", &self.depth_calls);
        Ok(self.depth.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn fetch_symbol_info(&self, _symbol: &str) -> Result<Option<SymbolInfo>, SourceError> {
        self.record("info", &self.info_calls);
        Ok(self.info.lock().unwrap().clone())
    }
}
