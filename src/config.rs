//! # config — อ่าน Config จาก Environment Variables
//!
//! Every knob has a default, so an empty environment logs XAUUSD from a
//! bridge on `localhost:8081` into `./data`. Malformed values are an error
//! at startup rather than a silent fallback.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::models::Timeframe;

#[derive(Debug, Clone)]
pub struct Config {
    /// Instrument to log, e.g. `"XAUUSD"`.
    pub symbol:             String,
    /// Root of the output layout.
    pub data_dir:           PathBuf,
    /// MT5 bridge base URL, or `"mock"`.
    pub bridge_url:         String,
    /// Max ticks per fetch.
    pub tick_batch:         usize,
    /// Base cadence: one tick cycle per loop iteration.
    pub loop_sleep:         Duration,
    /// Sleep after a failed tick fetch.
    pub retry_backoff:      Duration,
    /// Sleep after an iteration that faulted for any other reason.
    pub error_backoff:      Duration,
    /// Consecutive fetch failures before the watermark is force-reset.
    pub max_fails:          u32,
    pub depth_interval:     Duration,
    pub heartbeat_interval: Duration,
    pub bar_sync_interval:  Duration,
    pub metadata_interval:  Duration,
    pub timeframes:         Vec<Timeframe>,
    /// Per-request timeout towards the bridge.
    pub request_timeout:    Duration,
    /// Bind address of the status endpoint (disabled when `None`).
    pub status_addr:        Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol:             "XAUUSD".to_string(),
            data_dir:           PathBuf::from("data"),
            bridge_url:         "http://localhost:8081".to_string(),
            tick_batch:         1_000,
            loop_sleep:         Duration::from_millis(250),
            retry_backoff:      Duration::from_millis(500),
            error_backoff:      Duration::from_millis(1_000),
            max_fails:          5,
            depth_interval:     Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(10),
            bar_sync_interval:  Duration::from_secs(60),
            metadata_interval:  Duration::from_secs(3_600),
            timeframes:         Timeframe::ALL.to_vec(),
            request_timeout:    Duration::from_millis(5_000),
            status_addr:        None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse = |key: &str| -> anyhow::Result<Option<u64>> {
            get(key)
                .map(|v| v.parse::<u64>().with_context(|| format!("{key} must be a number, got '{v}'")))
                .transpose()
        };
        let millis = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            Ok(parse(key)?.map(Duration::from_millis).unwrap_or(default))
        };
        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            Ok(parse(key)?.map(Duration::from_secs).unwrap_or(default))
        };

        let tick_batch = parse("TICK_BATCH")?.map(|v| v as usize).unwrap_or(d.tick_batch);
        if tick_batch == 0 {
            bail!("TICK_BATCH must be at least 1");
        }

        let max_fails = parse("MAX_FAILS")?.map(|v| v as u32).unwrap_or(d.max_fails);
        if max_fails == 0 {
            bail!("MAX_FAILS must be at least 1");
        }

        let timeframes = match get("BAR_TIMEFRAMES") {
            Some(raw) => parse_timeframes(&raw)?,
            None => d.timeframes.clone(),
        };

        let status_addr = get("STATUS_ADDR")
            .map(|v| SocketAddr::from_str(&v).with_context(|| format!("STATUS_ADDR is not an address: '{v}'")))
            .transpose()?;

        Ok(Self {
            symbol:             get("SYMBOL").map(|s| s.to_uppercase()).unwrap_or(d.symbol),
            data_dir:           get("DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            bridge_url:         get("MT5_BRIDGE_URL").unwrap_or(d.bridge_url),
            tick_batch,
            loop_sleep:         millis("LOOP_SLEEP_MS", d.loop_sleep)?,
            retry_backoff:      millis("RETRY_BACKOFF_MS", d.retry_backoff)?,
            error_backoff:      millis("ERROR_BACKOFF_MS", d.error_backoff)?,
            max_fails,
            depth_interval:     secs("DEPTH_SNAP_SECS", d.depth_interval)?,
            heartbeat_interval: secs("HEARTBEAT_SECS", d.heartbeat_interval)?,
            bar_sync_interval:  secs("BAR_SYNC_SECS", d.bar_sync_interval)?,
            metadata_interval:  secs("METADATA_SECS", d.metadata_interval)?,
            timeframes,
            request_timeout:    millis("REQUEST_TIMEOUT_MS", d.request_timeout)?,
            status_addr,
        })
    }
}

/// `"M1, h1,M1"` → `[M1, H1]` (order kept, duplicates dropped).
fn parse_timeframes(raw: &str) -> anyhow::Result<Vec<Timeframe>> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let tf = part.parse::<Timeframe>().map_err(anyhow::Error::msg)?;
        if !out.contains(&tf) {
            out.push(tf);
        }
    }
    if out.is_empty() {
        bail!("BAR_TIMEFRAMES is set but lists no timeframes");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.symbol, "XAUUSD");
        assert_eq!(cfg.tick_batch, 1_000);
        assert_eq!(cfg.loop_sleep, Duration::from_millis(250));
        assert_eq!(cfg.max_fails, 5);
        assert_eq!(cfg.metadata_interval, Duration::from_secs(3_600));
        assert_eq!(cfg.timeframes.len(), 9);
        assert!(cfg.status_addr.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = from_pairs(&[
            ("SYMBOL", "eurusd"),
            ("TICK_BATCH", "250"),
            ("DEPTH_SNAP_SECS", "2"),
            ("BAR_TIMEFRAMES", "m1, H1,M1"),
            ("STATUS_ADDR", "127.0.0.1:3100"),
            ("MT5_BRIDGE_URL", "mock"),
        ])
        .unwrap();
        assert_eq!(cfg.symbol, "EURUSD");
        assert_eq!(cfg.tick_batch, 250);
        assert_eq!(cfg.depth_interval, Duration::from_secs(2));
        assert_eq!(cfg.timeframes, vec![Timeframe::M1, Timeframe::H1]);
        assert_eq!(cfg.status_addr.unwrap().port(), 3100);
        assert_eq!(cfg.bridge_url, "mock");
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(from_pairs(&[("TICK_BATCH", "lots")]).is_err());
        assert!(from_pairs(&[("TICK_BATCH", "0")]).is_err());
        assert!(from_pairs(&[("MAX_FAILS", "0")]).is_err());
        assert!(from_pairs(&[("BAR_TIMEFRAMES", "M2")]).is_err());
        assert!(from_pairs(&[("BAR_TIMEFRAMES", " , ")]).is_err());
        assert!(from_pairs(&[("STATUS_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let cfg = from_pairs(&[("SYMBOL", "  "), ("LOOP_SLEEP_MS", "")]).unwrap();
        assert_eq!(cfg.symbol, "XAUUSD");
        assert_eq!(cfg.loop_sleep, Duration::from_millis(250));
    }
}
