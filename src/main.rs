//! # tick-ingest — Restart-safe MT5 Market-Data Logger
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐  /api/ticks /api/rates    ┌──────────────────────────────┐
//!  │  MT5 Bridge  │ ◀──────────────────────── │  Scheduler (single task)     │
//!  │  (or mock)   │  /api/book  /api/symbol   │   tick cycle  every loop     │
//!  └──────────────┘                           │   bars / depth / meta / hb   │
//!                                             └──────────────┬───────────────┘
//!                                                            │ append-only CSV
//!                                                            ▼
//!                         <DATA_DIR>/ticks · ohlcv · dom · metadata  + state.json
//!                                                            │
//!  ┌──────────────┐   GET /api/status (optional)             │ watch channel
//!  │  Monitoring  │ ◀────────────────────────────────────────┘
//!  └──────────────┘
//! ```
//!
//! ## Environment Variables
//!
//! | Variable          | Default                 | Description                     |
//! |-------------------|-------------------------|---------------------------------|
//! | `SYMBOL`          | `XAUUSD`                | Instrument to log               |
//! | `DATA_DIR`        | `data`                  | Output root                     |
//! | `MT5_BRIDGE_URL`  | `http://localhost:8081` | Bridge base URL, or `mock`      |
//! | `STATUS_ADDR`     | unset                   | Bind address of status endpoint |
//! | `RUST_LOG`        | `tick_ingest=info`      | Tracing filter                  |
//!
//! The full list (cadences, backoffs, batch size) lives in [`config::Config`].

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod clock;
mod config;
mod engine;
mod enrich;
mod error;
mod models;
mod routes;
mod session;
mod source;
mod state;
mod storage;
mod watermark;

use clock::{Clock, SystemClock};
use config::Config;
use engine::scheduler::Scheduler;
use storage::DataLayout;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — CI/prod can use real env vars) ──────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("tick_ingest=info".parse()?)
            .add_directive("tower_http=info".parse()?))
        .init();

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        TICK-INGEST — MT5 Market Logger        ║
  ║   ticks · bars · depth · metadata → CSV       ║
  ╚═══════════════════════════════════════════════╝"#
    );

    // ── 3. Config ────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Invalid configuration")?;

    // ── 4. Output layout ─────────────────────────────────────────────────────
    let layout = DataLayout::new(&config.data_dir, &config.symbol);
    layout.create_dirs().context("Failed to create data directories")?;
    info!(
        symbol = %config.symbol,
        ticks  = %layout.tick_csv().display(),
        ohlcv  = %layout.ohlcv_dir().display(),
        dom    = %layout.dom_csv().display(),
        meta   = %layout.meta_dir().display(),
        "[INIT] Output layout ready"
    );

    // ── 5. Connect (the only fatal failure) + bootstrap ──────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = source::from_config(&config, clock.clone())?;
    let status_addr = config.status_addr;
    let mut scheduler = Scheduler::start(config, source, clock).await?;

    // ── 6. Optional status endpoint ──────────────────────────────────────────
    if let Some(addr) = status_addr {
        let status = scheduler.subscribe();
        tokio::spawn(async move {
            if let Err(e) = routes::serve(addr, status).await {
                error!(error = %e, "[STATUS] Status endpoint stopped");
            }
        });
    }

    // ── 7. Run until Ctrl+C ──────────────────────────────────────────────────
    scheduler.run_until(shutdown_signal()).await;

    info!("[SHUTDOWN] Bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "[SHUTDOWN] Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
