//! # source::bridge
//!
//! [`MarketSource`] over the MT5 HTTP bridge (a small Python/MQL5 service
//! sitting next to the terminal).
//!
//! ## Bridge API Contract
//!
//! | Method | Path          | Query                                  | Body                          |
//! |--------|---------------|----------------------------------------|-------------------------------|
//! | GET    | `/api/health` |                                        | `{ ok, terminal?, error? }`   |
//! | GET    | `/api/ticks`  | `symbol`, `from_msc`, `count`          | `{ ticks, last_error? }`      |
//! | GET    | `/api/rates`  | `symbol`, `timeframe`, `start`, `count`| `{ rates }`                   |
//! | GET    | `/api/book`   | `symbol`                               | `{ book }`                    |
//! | GET    | `/api/symbol` | `symbol`                               | `{ info }`                    |
//!
//! `ticks: null` together with `last_error: [code, message]` mirrors
//! `copy_ticks_from` returning `None`; codes 0 and 1 mean "no data".

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::models::{Bar, BookEntry, RawTick, SymbolInfo, Timeframe};

use super::MarketSource;

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HealthResponse {
    ok:       bool,
    #[serde(default)]
    terminal: Option<String>,
    #[serde(default)]
    error:    Option<String>,
}

#[derive(Debug, Deserialize)]
struct TicksResponse {
    ticks:      Option<Vec<RawTick>>,
    #[serde(default)]
    last_error: Option<(i64, String)>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Option<Vec<Bar>>,
}

#[derive(Debug, Deserialize)]
struct BookResponse {
    book: Option<Vec<BookEntry>>,
}

#[derive(Debug, Deserialize)]
struct SymbolResponse {
    info: Option<SymbolInfo>,
}

/// `None` from the terminal is "no ticks". A real error code is worth a
/// warning but is still not a failed fetch.
fn ticks_or_empty(resp: TicksResponse) -> Vec<RawTick> {
    match resp.ticks {
        Some(ticks) => ticks,
        None => {
            if let Some((code, message)) = resp.last_error {
                if code != 0 && code != 1 {
                    warn!(code, message = %message, "[TICKS] MT5 error");
                }
            }
            Vec::new()
        }
    }
}

// ─── BridgeSource ─────────────────────────────────────────────────────────────

pub struct BridgeSource {
    client:    reqwest::Client,
    base_url:  String,
    connected: AtomicBool,
}

impl BridgeSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url:  base_url.trim_end_matches('/').to_string(),
            connected: AtomicBool::new(false),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http { status, body });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl MarketSource for BridgeSource {
    fn name(&self) -> &str {
        "mt5-bridge"
    }

    async fn connect(&self) -> Result<(), SourceError> {
        let health: HealthResponse = self.get("/api/health", &[]).await?;
        if !health.ok {
            return Err(SourceError::NotConnected(
                health.error.unwrap_or_else(|| "terminal not initialised".into()),
            ));
        }

        self.connected.store(true, Ordering::Relaxed);
        info!(
            url      = %self.base_url,
            terminal = health.terminal.as_deref().unwrap_or("unknown"),
            "MT5 bridge healthy"
        );
        Ok(())
    }

    async fn disconnect(&self) {
        // Nothing to tear down on the HTTP side; the bridge owns the
        // terminal session.
        if self.connected.swap(false, Ordering::Relaxed) {
            debug!(url = %self.base_url, "MT5 bridge released");
        }
    }

    async fn fetch_ticks(
        &self,
        symbol: &str,
        since_msc: i64,
        max_count: usize,
    ) -> Result<Vec<RawTick>, SourceError> {
        let resp: TicksResponse = self
            .get(
                "/api/ticks",
                &[
                    ("symbol", symbol.to_string()),
                    ("from_msc", since_msc.to_string()),
                    ("count", max_count.to_string()),
                ],
            )
            .await?;
        Ok(ticks_or_empty(resp))
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, SourceError> {
        let resp: RatesResponse = self
            .get(
                "/api/rates",
                &[
                    ("symbol", symbol.to_string()),
                    ("timeframe", timeframe.to_string()),
                    ("start", start_pos.to_string()),
                    ("count", count.to_string()),
                ],
            )
            .await?;
        Ok(resp.rates.unwrap_or_default())
    }

    async fn fetch_depth(&self, symbol: &str) -> Result<Vec<BookEntry>, SourceError> {
        let resp: BookResponse = self
            .get("/api/book", &[("symbol", symbol.to_string())])
            .await?;
        Ok(resp.book.unwrap_or_default())
    }

    async fn fetch_symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, SourceError> {
        let resp: SymbolResponse = self
            .get("/api/symbol", &[("symbol", symbol.to_string())])
            .await?;
        Ok(resp.info)
    }
}
