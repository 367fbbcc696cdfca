//! Handlers feeding the rendering layer.
//!
//! Everything here reads the last published dashboard and never waits on
//! a refresh cycle.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use nanodc_core::dashboard::Dashboard;
use nanodc_core::types::Timestamp;

use crate::error::AppResult;
use crate::published::CycleStatus;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// The resolved slot list plus freshness information.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    /// `false` until the first successful cycle; every slot is then empty.
    pub has_data: bool,
    pub fetched_at: Option<Timestamp>,
    pub stale: bool,
    pub status: CycleStatus,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /dashboard -- the last published resolution.
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardView>>> {
    let stale = state
        .published
        .is_stale(state.settings.refresh_interval(), Utc::now());
    let status = (*state.published.status()).clone();

    let view = match state.published.current() {
        Some(published) => DashboardView {
            dashboard: published.dashboard.clone(),
            has_data: true,
            fetched_at: Some(published.fetched_at),
            stale,
            status,
        },
        None => DashboardView {
            dashboard: state
                .pipeline
                .placeholder(&state.settings.active_facility_id()),
            has_data: false,
            fetched_at: None,
            stale,
            status,
        },
    };

    Ok(Json(DataResponse { data: view }))
}
