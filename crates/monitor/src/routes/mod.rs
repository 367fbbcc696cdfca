pub mod health;

use axum::routing::{get, put};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /dashboard                     last published resolution (GET)
///
/// /facilities                    registered layouts (GET), reset (DELETE)
/// /facilities/{facility_id}      one layout (GET)
/// /facilities/{facility_id}/slots
///                                replace order (PUT), add slot (POST)
///
/// /settings                      stored values (GET)
/// /settings/facility             active facility (PUT)
/// /settings/refresh              refresh interval, fetch timeout (PUT)
/// /settings/credentials          service credentials (PUT)
///
/// /usage                         fetch statistics (GET), reset (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/facilities",
            get(handlers::facilities::list_facilities)
                .delete(handlers::facilities::reset_facilities),
        )
        .route(
            "/facilities/{facility_id}",
            get(handlers::facilities::get_facility),
        )
        .route(
            "/facilities/{facility_id}/slots",
            put(handlers::facilities::set_slot_order).post(handlers::facilities::insert_slot),
        )
        .route("/settings", get(handlers::settings::get_settings))
        .route("/settings/facility", put(handlers::settings::set_facility))
        .route("/settings/refresh", put(handlers::settings::set_refresh))
        .route(
            "/settings/credentials",
            put(handlers::settings::set_credentials),
        )
        .route(
            "/usage",
            get(handlers::settings::get_usage).delete(handlers::settings::reset_usage),
        )
}
