//! Handlers for facility slot layouts.
//!
//! Layout changes apply to the registry in memory and take effect on the
//! next refresh cycle. They are not written to disk; restarts start from
//! the built-in layouts plus the override table.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use nanodc_core::facility::FacilityConfiguration;
use nanodc_core::slot::{SlotDescriptor, SlotKind};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InsertSlotRequest {
    pub kind: SlotKind,
    /// Display position; appended when absent or past the end.
    pub position: Option<usize>,
}

/// GET /facilities -- every registered facility layout.
pub async fn list_facilities(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<FacilityConfiguration>>>> {
    let registry = state.pipeline.registry();
    let configs = registry
        .facility_ids()
        .iter()
        .map(|id| (*registry.configuration(id)).clone())
        .collect();
    Ok(Json(DataResponse { data: configs }))
}

/// GET /facilities/{facility_id} -- one facility layout. Unknown ids get
/// the default layout.
pub async fn get_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
) -> AppResult<Json<DataResponse<FacilityConfiguration>>> {
    let config = (*state.pipeline.registry().configuration(&facility_id)).clone();
    Ok(Json(DataResponse { data: config }))
}

/// PUT /facilities/{facility_id}/slots -- replace the slot order.
///
/// Ordinals already in use must keep their tile kind (409); ordinals must
/// be unique within the layout (400).
pub async fn set_slot_order(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    Json(order): Json<Vec<SlotDescriptor>>,
) -> AppResult<Json<DataResponse<FacilityConfiguration>>> {
    let config = state.pipeline.registry().set_slot_order(&facility_id, order)?;
    tracing::info!(
        facility_id = %config.facility_id,
        slots = config.slots.len(),
        "Slot order replaced"
    );
    Ok(Json(DataResponse {
        data: (*config).clone(),
    }))
}

/// POST /facilities/{facility_id}/slots -- add one slot with a fresh ordinal.
pub async fn insert_slot(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
    Json(input): Json<InsertSlotRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SlotDescriptor>>)> {
    let registry = state.pipeline.registry();
    let slot = match input.position {
        Some(position) => registry.insert_slot(&facility_id, position, input.kind)?,
        None => registry.append_slot(&facility_id, input.kind)?,
    };
    tracing::info!(%facility_id, ordinal = slot.ordinal, kind = ?slot.kind, "Slot added");
    Ok((StatusCode::CREATED, Json(DataResponse { data: slot })))
}

/// DELETE /facilities -- restore the built-in layouts.
pub async fn reset_facilities(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.pipeline.registry().reset_to_default();
    Ok(StatusCode::NO_CONTENT)
}
