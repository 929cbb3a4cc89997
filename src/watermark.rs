//! # watermark
//!
//! Persisted resume point of the tick stream.
//!
//! Both directions fail soft:
//! * `load` never errors. A missing, corrupt or out-of-range file resumes
//!   from `now − 2s`, a short bounded re-fetch.
//! * `save` logs and carries on. The in-memory watermark stays authoritative
//!   for the rest of the process lifetime.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::clock::iso_millis;
use crate::error::StoreError;

/// How far back a fresh or damaged state resumes from.
pub const LOAD_FALLBACK_MS: i64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    /// Next tick time to fetch from (ms since epoch). Always `0 < t <= now`.
    pub last_tick_time: i64,
    pub updated_at:     DateTime<Utc>,
}

impl Watermark {
    pub fn new(last_tick_time: i64, updated_at: DateTime<Utc>) -> Self {
        Self { last_tick_time, updated_at }
    }
}

/// On-disk shape of `state.json`.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    last_time_msc: i64,
    #[serde(default)]
    last_time_dt:  Option<String>,
    #[serde(default)]
    updated_at:    Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, now: DateTime<Utc>) -> Watermark {
        let now_msc = now.timestamp_millis();

        let (value, updated_at) = match self.read() {
            Ok(state) => (state.last_time_msc, state.updated_at.unwrap_or(now)),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "[STATE] No usable state file");
                (0, now)
            }
        };

        if value <= 0 || value > now_msc {
            let fallback = now_msc - LOAD_FALLBACK_MS;
            if value != 0 {
                warn!(
                    stored   = value,
                    fallback = fallback,
                    "[STATE] Stored watermark out of range — clamping"
                );
            }
            return Watermark::new(fallback, now);
        }

        Watermark::new(value, updated_at)
    }

    fn read(&self) -> Result<StateFile, StoreError> {
        let text = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write via a sibling temp file + rename so a crash mid-write never
    /// leaves a truncated `state.json` behind.
    pub fn try_save(&self, last_tick_time: i64, now: DateTime<Utc>) -> Result<(), StoreError> {
        let state = StateFile {
            last_time_msc: last_tick_time,
            last_time_dt:  Some(iso_millis(last_tick_time)),
            updated_at:    Some(now),
        };
        let body = serde_json::to_string_pretty(&state)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Fail-soft save. Returns whether the write landed.
    pub fn save(&self, last_tick_time: i64, now: DateTime<Utc>) -> bool {
        match self.try_save(last_tick_time, now) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, watermark = last_tick_time, "[STATE] Failed to save state");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap()
    }

    fn store() -> (tempfile::TempDir, WatermarkStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("state.json"));
        (dir, store)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, store) = store();
        let t = now().timestamp_millis() - 60_000;
        assert!(store.save(t, now()));

        let wm = store.load(now());
        assert_eq!(wm.last_tick_time, t);
        assert_eq!(wm.updated_at, now());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let (_dir, store) = store();
        let wm = store.load(now());
        assert_eq!(wm.last_tick_time, now().timestamp_millis() - LOAD_FALLBACK_MS);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let expected = now().timestamp_millis() - LOAD_FALLBACK_MS;
        for stored in [0, -5_000, now().timestamp_millis() + 1] {
            let (_dir, store) = store();
            fs::write(store.path(), format!(r#"{{"last_time_msc": {stored}}}"#)).unwrap();
            assert_eq!(store.load(now()).last_tick_time, expected, "stored={stored}");
        }
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let (_dir, store) = store();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(
            store.load(now()).last_tick_time,
            now().timestamp_millis() - LOAD_FALLBACK_MS
        );
    }

    #[test]
    fn test_save_failure_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("missing-dir").join("state.json"));
        assert!(!store.save(1, now()));
        assert!(store.try_save(1, now()).is_err());
    }

    #[test]
    fn test_state_file_is_readable_json() {
        let (_dir, store) = store();
        store.save(1_704_114_000_123, now());
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["last_time_msc"], 1_704_114_000_123_i64);
        assert_eq!(raw["last_time_dt"], "2024-01-01T13:00:00.123Z");
    }
}
