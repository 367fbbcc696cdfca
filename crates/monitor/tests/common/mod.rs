#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use httpmock::prelude::*;
use httpmock::Mock;
use tower::ServiceExt;

use nanodc_client::{Credentials, TelemetryClient};
use nanodc_monitor::background::RefreshScheduler;
use nanodc_monitor::config::MonitorConfig;
use nanodc_monitor::pipeline::Pipeline;
use nanodc_monitor::published::DashboardState;
use nanodc_monitor::router::build_app_router;
use nanodc_monitor::state::AppState;
use nanodc_store::SettingsStore;

pub const LOGIN_PATH: &str = "/api/users/login";
pub const DATA_PATH: &str = "/api/users/data";

/// BC02 snapshot with a post worker and a NAS unit.
pub const BC02_SNAPSHOT: &str = r#"{
    "nodes": [
        {"id": 1, "node_id": "n-post", "node_name": "BC02 Post Worker", "status": "active"},
        {"id": 2, "node_id": "n-nas3", "node_name": "BC02 NAS3", "status": "active"}
    ],
    "node_usage": [
        {"id": 1, "node_id": "n-post", "timestamp": "2024-05-01T10:00:00", "cpu_usage_percent": "57.3"}
    ],
    "hardware_specs": [],
    "scores": [],
    "nanodc": [],
    "ndpListFiltered": []
}"#;

/// Build a test `MonitorConfig` pointing at `api_url`.
pub fn test_config(api_url: &str) -> MonitorConfig {
    MonitorConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        api_url: api_url.to_string(),
        login_path: LOGIN_PATH.to_string(),
        data_path: DATA_PATH.to_string(),
        credentials: Credentials::new("operator", "secret"),
        settings_path: "unused.json".into(),
        overrides_path: None,
    }
}

/// Scheduler plus the state shared with the HTTP surface, wired against
/// `api_url` with an in-memory settings store.
pub fn harness(api_url: &str) -> (RefreshScheduler, AppState) {
    let config = test_config(api_url);
    let settings = Arc::new(SettingsStore::in_memory());
    let pipeline = Arc::new(Pipeline::builtin());
    let published = Arc::new(DashboardState::new());

    let client = TelemetryClient::new(
        config.client_config(Duration::from_secs(2)),
        settings.clone(),
    )
    .unwrap();
    let (scheduler, credentials) = RefreshScheduler::new(
        client,
        Arc::clone(&settings),
        Arc::clone(&pipeline),
        Arc::clone(&published),
        config.credentials.clone(),
    );

    let state = AppState {
        config: Arc::new(config),
        settings,
        pipeline,
        published,
        credentials,
    };
    (scheduler, state)
}

/// Build the full application router, with the same middleware as the
/// binary.
pub fn build_test_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Mock service
// ---------------------------------------------------------------------------

pub async fn mock_login(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"token": "test-token-0001"}"#);
        })
        .await
}

pub async fn mock_data<'a>(server: &'a MockServer, status: u16, body: &str) -> Mock<'a> {
    let body = body.to_string();
    server
        .mock_async(|when, then| {
            when.path(DATA_PATH);
            then.status(status)
                .header("content-type", "application/json")
                .body(body);
        })
        .await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}
