//! # routes::status
//!
//! Read-only view of the running logger.
//!
//! ## Endpoints
//!
//! | Method | Path          | Description                                        |
//! |--------|---------------|----------------------------------------------------|
//! | GET    | `/api/health` | Liveness, run id, uptime                           |
//! | GET    | `/api/status` | Latest [`StatusSnapshot`] (watermark, totals, ...) |

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::{SharedStatus, StatusSnapshot};

// ─── GET /api/health ──────────────────────────────────────────────────────────

/// Monitoring polls this; `stale_secs` grows if the loop stops publishing.
pub async fn health_check(State(status): State<SharedStatus>) -> impl IntoResponse {
    let snap = status.borrow().clone();
    let now = chrono::Utc::now();

    Json(json!({
        "ok":          true,
        "run_id":      snap.run_id,
        "symbol":      snap.symbol,
        "source":      snap.source,
        "uptime_secs": (now - snap.started_at).num_seconds(),
        "stale_secs":  (now - snap.updated_at).num_seconds(),
    }))
}

// ─── GET /api/status ──────────────────────────────────────────────────────────

pub async fn get_status(State(status): State<SharedStatus>) -> Json<StatusSnapshot> {
    Json(status.borrow().clone())
}
