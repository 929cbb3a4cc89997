//! # error
//!
//! Error types for the two seams that can fail: the upstream source and the
//! on-disk stores. Neither is fatal inside the loop; only the startup
//! `connect()` surfaces to `main` (wrapped in `anyhow`).

use std::io;

use thiserror::Error;

/// Failures talking to the MT5 bridge.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network / timeout / connection refused.
    #[error("bridge unreachable: {0}")]
    Transport(String),

    /// The bridge answered with a non-2xx status.
    #[error("bridge HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body did not match the expected shape.
    #[error("bridge response decode failed: {0}")]
    Decode(String),

    /// The terminal behind the bridge is not logged in / not initialised.
    #[error("terminal not connected: {0}")]
    NotConnected(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Decode(err.to_string())
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

/// Failures writing logs or the watermark file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path:   String,
        #[source]
        source: io::Error,
    },

    #[error("state encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Failure of one periodic task invocation. Logged at the loop boundary,
/// never propagated further.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
