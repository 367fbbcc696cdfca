//! Handlers for device settings and usage statistics.
//!
//! Setting changes are written to the store immediately and picked up by
//! the refresh scheduler at the start of its next cycle. Store writes touch
//! the settings file, so they run on the blocking pool.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use nanodc_client::Credentials;
use nanodc_core::facility::known_nanodc_id;
use nanodc_core::types::{FacilityId, Timestamp};
use nanodc_core::usage::{format_bytes, UsageCounters};
use nanodc_store::{DeviceSettings, SettingsStore, StoreError};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetFacilityRequest {
    pub facility_id: String,
}

#[derive(Debug, Serialize)]
pub struct FacilityChange {
    pub facility_id: FacilityId,
    /// Whether the facility has a remote id; unknown facilities fetch
    /// unscoped and use the default layout.
    pub known: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetCredentialsRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRefreshRequest {
    pub refresh_interval_ms: Option<u64>,
    pub api_timeout_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UsageView {
    #[serde(flatten)]
    pub counters: UsageCounters,
    pub success_rate: f64,
    pub total_bytes_label: String,
    pub last_sync_time: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /settings -- every stored value.
pub async fn get_settings(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DeviceSettings>>> {
    Ok(Json(DataResponse {
        data: state.settings.settings(),
    }))
}

/// PUT /settings/facility -- switch the active facility from the next cycle.
pub async fn set_facility(
    State(state): State<AppState>,
    Json(input): Json<SetFacilityRequest>,
) -> AppResult<Json<DataResponse<FacilityChange>>> {
    let facility_id = write_settings(&state, move |store| {
        store.set_active_facility_id(&input.facility_id)?;
        Ok(store.active_facility_id())
    })
    .await?;
    let known = known_nanodc_id(&facility_id).is_some();
    if !known {
        tracing::warn!(%facility_id, "Active facility has no known remote id");
    }
    Ok(Json(DataResponse {
        data: FacilityChange { facility_id, known },
    }))
}

/// PUT /settings/refresh -- change the refresh interval and fetch timeout.
pub async fn set_refresh(
    State(state): State<AppState>,
    Json(input): Json<SetRefreshRequest>,
) -> AppResult<Json<DataResponse<DeviceSettings>>> {
    if input.refresh_interval_ms.is_none() && input.api_timeout_seconds.is_none() {
        return Err(AppError::BadRequest(
            "refresh_interval_ms or api_timeout_seconds is required".into(),
        ));
    }
    let settings = write_settings(&state, move |store| {
        if let Some(ms) = input.refresh_interval_ms {
            store.set_refresh_interval_ms(ms)?;
        }
        if let Some(seconds) = input.api_timeout_seconds {
            store.set_api_timeout_seconds(seconds)?;
        }
        Ok(store.settings())
    })
    .await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /settings/credentials -- replace the service credentials. Resumes a
/// scheduler suspended by rejected credentials.
pub async fn set_credentials(
    State(state): State<AppState>,
    Json(input): Json<SetCredentialsRequest>,
) -> AppResult<StatusCode> {
    if input.user_id.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "user_id and password must not be empty".into(),
        ));
    }
    state
        .credentials
        .replace(Credentials::new(input.user_id.trim(), input.password));
    Ok(StatusCode::NO_CONTENT)
}

/// GET /usage -- fetch statistics.
pub async fn get_usage(State(state): State<AppState>) -> AppResult<Json<DataResponse<UsageView>>> {
    let counters = state.settings.usage();
    let view = UsageView {
        success_rate: counters.success_rate(),
        total_bytes_label: format_bytes(counters.total_bytes),
        last_sync_time: state.settings.last_sync_time(),
        counters,
    };
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /usage -- zero the counters.
pub async fn reset_usage(State(state): State<AppState>) -> AppResult<StatusCode> {
    write_settings(&state, SettingsStore::reset_usage).await?;
    tracing::info!("Usage counters reset");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run a store write on the blocking pool.
async fn write_settings<T, F>(state: &AppState, write: F) -> AppResult<T>
where
    F: FnOnce(&SettingsStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.settings);
    let result = tokio::task::spawn_blocking(move || write(&store))
        .await
        .map_err(|e| AppError::InternalError(format!("Settings write task failed: {e}")))?;
    Ok(result?)
}
