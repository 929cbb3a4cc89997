//! # routes
//!
//! Optional HTTP status endpoint, enabled by `STATUS_ADDR`. It only reads the
//! snapshots the scheduler publishes and can never stall ingestion.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::state::SharedStatus;

pub mod status;

use status::{get_status, health_check};

pub fn router(status: SharedStatus) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(status)
}

pub async fn serve(addr: SocketAddr, status: SharedStatus) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind status endpoint on {addr}"))?;
    info!(?addr, "[STATUS] Status endpoint listening");
    axum::serve(listener, router(status)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::engine::scheduler::Schedule;
    use crate::state::{IngestState, StatusSnapshot};
    use crate::watermark::Watermark;

    fn channel() -> (watch::Sender<StatusSnapshot>, SharedStatus) {
        let now = Utc::now();
        let mut state = IngestState::new(
            Watermark::new(now.timestamp_millis() - 2_000, now),
            5,
            Schedule::new(&Config::default(), now),
        );
        state.total_ticks = 12;
        watch::channel(StatusSnapshot::initial("XAUUSD", "mock", &state, now))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (_tx, rx) = channel();
        let (code, body) = get_json(router(rx), "/api/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["symbol"], "XAUUSD");
    }

    #[tokio::test]
    async fn test_status_reflects_latest_snapshot() {
        let (tx, rx) = channel();
        let app = router(rx);

        let (_, body) = get_json(app.clone(), "/api/status").await;
        assert_eq!(body["total_ticks"], 12);
        assert_eq!(body["depth"], "UNKNOWN");

        tx.send_modify(|snap| snap.total_ticks = 99);
        let (_, body) = get_json(app, "/api/status").await;
        assert_eq!(body["total_ticks"], 99);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (_tx, rx) = channel();
        let response = router(rx)
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
