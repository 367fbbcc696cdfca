//! HTTP surface assembly.
//!
//! The binary and the integration tests both call [`build_app_router`], so
//! every test request passes through the production middleware.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::MonitorConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Routes plus middleware, ready to serve.
///
/// Layers are listed outermost first: a request meets CORS, then gets an
/// id, is traced, and only then reaches the timeout and panic guards
/// wrapped around the handler.
pub fn build_app_router(state: AppState, config: &MonitorConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        // One INFO span per request, closed with status and latency.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Echo the id so the panel can quote it in bug reports.
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // A panicking handler answers 500; the refresh task keeps running.
        .layer(CatchPanicLayer::new());

    Router::new()
        // Liveness and data freshness, outside the versioned tree.
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(middleware)
        // Preflight answers never reach the handlers. Applied last so it
        // stays outermost.
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the configured panel origins.
///
/// Panics on an unparsable origin; this only runs during startup.
pub fn build_cors_layer(config: &MonitorConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
