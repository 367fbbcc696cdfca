//! Client behaviour against a mock telemetry service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use httpmock::prelude::*;
use httpmock::Method::HEAD;

use nanodc_client::{AuthError, AuthToken, ClientConfig, Credentials, FetchError, TelemetryClient};
use nanodc_core::usage::UsageRecorder;

const DATA_PATH: &str = "/api/users/data";
const LOGIN_PATH: &str = "/api/users/login";

const SNAPSHOT_BODY: &str = r#"{
    "nodes": [{"id": 1, "node_id": "n1", "node_name": "BC02 Post Worker", "status": "active"}],
    "node_usage": [{"id": 1, "node_id": "n1", "timestamp": "2024-01-01T00:00:00", "cpu_usage_percent": "57.3"}],
    "hardware_specs": [],
    "scores": [],
    "nanodc": [],
    "ndpListFiltered": []
}"#;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingRecorder {
    calls: Mutex<Vec<(bool, u64)>>,
}

impl RecordingRecorder {
    fn calls(&self) -> Vec<(bool, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl UsageRecorder for RecordingRecorder {
    fn record_api_call(&self, _latency: Duration, success: bool, bytes: u64) {
        self.calls.lock().unwrap().push((success, bytes));
    }
}

fn client_for(server: &MockServer) -> (TelemetryClient, Arc<RecordingRecorder>) {
    let mut config = ClientConfig::new(server.base_url());
    config.request_timeout = Duration::from_millis(500);
    let recorder = Arc::new(RecordingRecorder::default());
    let client = TelemetryClient::new(config, recorder.clone()).unwrap();
    (client, recorder)
}

fn token() -> AuthToken {
    AuthToken::new("tok-123")
}

// ---------------------------------------------------------------------------
// Fetch: GET -> POST fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_get_issues_no_post() {
    let server = MockServer::start_async().await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(DATA_PATH)
                .header("authorization", "Bearer tok-123");
            then.status(200)
                .header("content-type", "application/json")
                .body(SNAPSHOT_BODY);
        })
        .await;
    let post = server
        .mock_async(|when, then| {
            when.method(POST).path(DATA_PATH);
            then.status(200).body(SNAPSHOT_BODY);
        })
        .await;

    let (client, recorder) = client_for(&server);
    let snapshot = client.fetch_snapshot(&token()).await.unwrap();

    assert_eq!(snapshot.nodes[0].node_name, "BC02 Post Worker");
    get.assert_async().await;
    post.assert_hits_async(0).await;
    assert_eq!(recorder.calls(), vec![(true, SNAPSHOT_BODY.len() as u64)]);
}

#[tokio::test]
async fn failed_get_falls_back_to_exactly_one_post() {
    let server = MockServer::start_async().await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET).path(DATA_PATH);
            then.status(500);
        })
        .await;
    let post = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(DATA_PATH)
                .header("authorization", "Bearer tok-123");
            then.status(200).body(SNAPSHOT_BODY);
        })
        .await;

    let (client, recorder) = client_for(&server);
    let snapshot = client.fetch_snapshot(&token()).await.unwrap();

    assert_eq!(snapshot.nodes.len(), 1);
    get.assert_hits_async(1).await;
    post.assert_hits_async(1).await;
    assert_eq!(recorder.calls().len(), 1);
}

#[tokio::test]
async fn both_attempts_failing_reports_post_outcome() {
    let server = MockServer::start_async().await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET).path(DATA_PATH);
            then.status(500);
        })
        .await;
    let post = server
        .mock_async(|when, then| {
            when.method(POST).path(DATA_PATH);
            then.status(503);
        })
        .await;

    let (client, recorder) = client_for(&server);
    let result = client.fetch_snapshot(&token()).await;

    assert_eq!(result.unwrap_err(), FetchError::ServerError(503));
    get.assert_hits_async(1).await;
    post.assert_hits_async(1).await;
    assert_eq!(recorder.calls(), vec![(false, 0)]);
}

#[tokio::test]
async fn rejected_token_is_unauthorized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(DATA_PATH);
            then.status(401);
        })
        .await;

    let (client, _) = client_for(&server);
    let result = client.fetch_snapshot(&token()).await;

    assert_eq!(result.unwrap_err(), FetchError::Unauthorized(401));
}

#[tokio::test]
async fn empty_body_is_reported_without_fallback() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(DATA_PATH);
            then.status(200).body("");
        })
        .await;
    let post = server
        .mock_async(|when, then| {
            when.method(POST).path(DATA_PATH);
            then.status(200).body(SNAPSHOT_BODY);
        })
        .await;

    let (client, recorder) = client_for(&server);
    let result = client.fetch_snapshot(&token()).await;

    assert_eq!(result.unwrap_err(), FetchError::EmptyBody);
    post.assert_hits_async(0).await;
    assert_eq!(recorder.calls(), vec![(false, 0)]);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(DATA_PATH);
            then.status(200)
                .body(SNAPSHOT_BODY)
                .delay(Duration::from_secs(2));
        })
        .await;

    let (client, _) = client_for(&server);
    let result = client.fetch_snapshot(&token()).await;

    assert_eq!(result.unwrap_err(), FetchError::Timeout);
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let mut config = ClientConfig::new("http://127.0.0.1:1");
    config.request_timeout = Duration::from_millis(500);
    let client = TelemetryClient::unrecorded(config).unwrap();

    let result = client.fetch_snapshot(&token()).await;

    assert_matches!(result, Err(FetchError::Unreachable(_)));
}

#[tokio::test]
async fn scoped_fetch_carries_facility_id() {
    let server = MockServer::start_async().await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(DATA_PATH)
                .query_param("nanodc_id", "dc-1");
            then.status(404);
        })
        .await;
    let post = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(DATA_PATH)
                .json_body(serde_json::json!({ "nanodc_id": "dc-1" }));
            then.status(200).body(SNAPSHOT_BODY);
        })
        .await;

    let (client, _) = client_for(&server);
    client
        .fetch_snapshot_scoped(&token(), Some("dc-1"))
        .await
        .unwrap();

    get.assert_async().await;
    post.assert_async().await;
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_returns_token() {
    let server = MockServer::start_async().await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .json_body(serde_json::json!({ "user_id": "operator", "password": "pw" }));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"token": "abc.def.ghi"}"#);
        })
        .await;

    let (client, _) = client_for(&server);
    let token = client
        .authenticate(&Credentials::new("operator", "pw"))
        .await
        .unwrap();

    assert_eq!(token.as_str(), "abc.def.ghi");
    login.assert_async().await;
}

#[tokio::test]
async fn login_401_is_invalid_credentials() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(401);
        })
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .authenticate(&Credentials::new("operator", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert!(err.is_terminal());
}

#[tokio::test]
async fn login_5xx_is_retryable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(502);
        })
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .authenticate(&Credentials::new("operator", "pw"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::ServerError(502));
    assert!(!err.is_terminal());
}

#[tokio::test]
async fn login_timeout_is_retryable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200)
                .body(r#"{"token": "late"}"#)
                .delay(Duration::from_secs(2));
        })
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .authenticate(&Credentials::new("operator", "pw"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::Timeout);
    assert!(!err.is_terminal());
}

#[tokio::test]
async fn login_without_token_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200).body(r#"{"message": "ok"}"#);
        })
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .authenticate(&Credentials::new("operator", "pw"))
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::MalformedResponse(_));
}

#[tokio::test]
async fn login_to_closed_port_is_unreachable() {
    let mut config = ClientConfig::new("http://127.0.0.1:1");
    config.request_timeout = Duration::from_millis(500);
    let client = TelemetryClient::unrecorded(config).unwrap();

    let err = client
        .authenticate(&Credentials::new("operator", "pw"))
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::Unreachable(_));
}

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reachability_counts_client_errors_as_reachable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(HEAD).path("/");
            then.status(404);
        })
        .await;

    let (client, _) = client_for(&server);
    assert!(client.check_reachability().await);

    let closed = TelemetryClient::unrecorded(ClientConfig::new("http://127.0.0.1:1")).unwrap();
    assert!(!closed.check_reachability().await);
}
