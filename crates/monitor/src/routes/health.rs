use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the last published data is stale.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether any refresh cycle has succeeded.
    pub has_data: bool,
    pub stale: bool,
}

/// GET /health -- service health and data freshness.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let has_data = state.published.current().is_some();
    let stale = state
        .published
        .is_stale(state.settings.refresh_interval(), Utc::now());
    let status = if stale || state.published.status().credentials_rejected {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        has_data,
        stale,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
