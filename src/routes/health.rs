//! Liveness endpoint for the dashboard server.
//!
//! `GET /health` answers without touching object storage, so it reports
//! whether the process is serving, not whether the archive is reachable.

use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Generic over the state type so it merges into the gateway router.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
