//! Refresh cycles against a mock telemetry service.
//!
//! Tests cover publication, stale-on-failure, credential rejection,
//! token expiry, timeouts and facility switching.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use httpmock::prelude::*;

use nanodc_client::{AuthError, Credentials, FetchError};
use nanodc_core::facility::{FACILITY_BC01, FACILITY_BC02};
use nanodc_monitor::background::{CycleFailure, CycleOutcome};

use common::{harness, mock_data, mock_login, BC02_SNAPSHOT, DATA_PATH, LOGIN_PATH};

// ---------------------------------------------------------------------------
// Test: a successful cycle publishes the resolved BC02 layout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_cycle_publishes_dashboard() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    mock_data(&server, 200, BC02_SNAPSHOT).await;

    let (mut scheduler, state) = harness(&server.base_url());
    state.settings.set_active_facility_id(FACILITY_BC02).unwrap();

    let outcome = scheduler.run_cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::Published {
            facility_id: FACILITY_BC02.to_string(),
            filled: 2,
        }
    );
    let published = state.published.current().unwrap();
    let post_worker = published
        .dashboard
        .entries
        .iter()
        .find(|e| e.resolved.slot.ordinal == 6)
        .unwrap();
    assert_eq!(
        post_worker.resolved.node.as_ref().unwrap().node_name,
        "BC02 Post Worker"
    );
    assert!(state.settings.last_sync_time().is_some());
    assert_eq!(state.settings.usage().success_count, 1);
}

// ---------------------------------------------------------------------------
// Test: a failed cycle leaves the last good dashboard in place
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_cycle_keeps_previous_dashboard() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    let mut data = mock_data(&server, 200, BC02_SNAPSHOT).await;

    let (mut scheduler, state) = harness(&server.base_url());
    state.settings.set_active_facility_id(FACILITY_BC02).unwrap();

    assert_matches!(scheduler.run_cycle().await, CycleOutcome::Published { .. });
    let before = state.published.current().unwrap();

    data.delete_async().await;
    mock_data(&server, 500, "").await;

    let outcome = scheduler.run_cycle().await;

    assert_matches!(
        outcome,
        CycleOutcome::Failed(CycleFailure::Fetch(FetchError::ServerError(500)))
    );
    let after = state.published.current().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(before.dashboard.entries, after.dashboard.entries);

    let status = state.published.status();
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_error.is_some());
    assert!(state
        .published
        .is_stale(Duration::from_secs(30), chrono::Utc::now()));
}

// ---------------------------------------------------------------------------
// Test: nothing is published before the first success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_service_publishes_nothing() {
    let (mut scheduler, state) = harness("http://127.0.0.1:1");

    let outcome = scheduler.run_cycle().await;

    assert_matches!(
        outcome,
        CycleOutcome::Failed(CycleFailure::Auth(AuthError::Unreachable(_)))
    );
    assert!(state.published.current().is_none());
}

// ---------------------------------------------------------------------------
// Test: rejected credentials suspend refresh until replaced
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_credentials_suspend_until_replaced() {
    let server = MockServer::start_async().await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .json_body(serde_json::json!({ "user_id": "operator", "password": "secret" }));
            then.status(401);
        })
        .await;
    let accepted = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .json_body(serde_json::json!({ "user_id": "operator", "password": "rotated" }));
            then.status(200).body(r#"{"token": "fresh-token"}"#);
        })
        .await;
    mock_data(&server, 200, BC02_SNAPSHOT).await;

    let (mut scheduler, state) = harness(&server.base_url());

    assert_matches!(
        scheduler.run_cycle().await,
        CycleOutcome::Failed(CycleFailure::Auth(AuthError::InvalidCredentials))
    );
    assert!(state.published.status().credentials_rejected);

    // No further login attempts while suspended.
    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Suspended);
    assert_eq!(scheduler.run_cycle().await, CycleOutcome::Suspended);
    rejected.assert_hits_async(1).await;

    state
        .credentials
        .replace(Credentials::new("operator", "rotated"));

    assert_matches!(scheduler.run_cycle().await, CycleOutcome::Published { .. });
    accepted.assert_hits_async(1).await;
    assert!(!state.published.status().credentials_rejected);
}

// ---------------------------------------------------------------------------
// Test: the token is reused, and dropped when the service rejects it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_token_triggers_reauthentication() {
    let server = MockServer::start_async().await;
    let login = mock_login(&server).await;
    let mut data = mock_data(&server, 200, BC02_SNAPSHOT).await;

    let (mut scheduler, _state) = harness(&server.base_url());

    scheduler.run_cycle().await;
    scheduler.run_cycle().await;
    login.assert_hits_async(1).await;

    data.delete_async().await;
    let mut unauthorized = mock_data(&server, 401, "").await;
    assert_matches!(
        scheduler.run_cycle().await,
        CycleOutcome::Failed(CycleFailure::Fetch(FetchError::Unauthorized(401)))
    );

    unauthorized.delete_async().await;
    mock_data(&server, 200, BC02_SNAPSHOT).await;
    assert_matches!(scheduler.run_cycle().await, CycleOutcome::Published { .. });
    login.assert_hits_async(2).await;
}

// ---------------------------------------------------------------------------
// Test: the cycle is bounded by the configured fetch timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_fetch_times_out() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    server
        .mock_async(|when, then| {
            when.path(DATA_PATH);
            then.status(200)
                .body(BC02_SNAPSHOT)
                .delay(Duration::from_secs(5));
        })
        .await;

    let (mut scheduler, state) = harness(&server.base_url());
    state.settings.set_api_timeout_seconds(1).unwrap();

    let outcome = scheduler.run_cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::Failed(CycleFailure::TimedOut(Duration::from_secs(1)))
    );
    assert!(state.published.current().is_none());
}

// ---------------------------------------------------------------------------
// Test: a facility switch applies from the next cycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn facility_switch_takes_effect_next_cycle() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    mock_data(&server, 200, BC02_SNAPSHOT).await;

    let (mut scheduler, state) = harness(&server.base_url());
    state.settings.set_active_facility_id(FACILITY_BC02).unwrap();

    scheduler.run_cycle().await;
    state.settings.set_active_facility_id(FACILITY_BC01).unwrap();

    // Published data still belongs to the facility of the finished cycle.
    let published = state.published.current().unwrap();
    assert_eq!(published.dashboard.facility_id, FACILITY_BC02);

    scheduler.run_cycle().await;

    let published = state.published.current().unwrap();
    assert_eq!(published.dashboard.facility_id, FACILITY_BC01);
    assert_eq!(
        state.pipeline.registry().active().facility_id,
        FACILITY_BC01
    );
}

// ---------------------------------------------------------------------------
// Test: the background task stops on cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduler_runs_until_cancelled() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    let data = mock_data(&server, 200, BC02_SNAPSHOT).await;

    let (scheduler, state) = harness(&server.base_url());
    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    // The first tick fires immediately.
    for _ in 0..50 {
        if state.published.current().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(state.published.current().is_some());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    data.assert_hits_async(1).await;
}
