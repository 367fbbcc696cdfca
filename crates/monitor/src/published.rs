//! Last-known-good dashboard and cycle status.
//!
//! The scheduler is the only writer. Readers load an `Arc` and never block
//! it; a published dashboard is never mutated, only replaced.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::Utc;
use serde::Serialize;

use nanodc_core::dashboard::Dashboard;
use nanodc_core::snapshot::Snapshot;
use nanodc_core::types::Timestamp;

/// One successful cycle's result.
#[derive(Debug)]
pub struct PublishedDashboard {
    pub dashboard: Dashboard,
    pub snapshot: Arc<Snapshot>,
    pub fetched_at: Timestamp,
}

/// Outcome history of the refresh cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleStatus {
    pub last_success_at: Option<Timestamp>,
    pub last_failure_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Set when the service rejected the configured credentials. Cleared
    /// when new credentials are supplied.
    pub credentials_rejected: bool,
}

#[derive(Default)]
pub struct DashboardState {
    current: ArcSwapOption<PublishedDashboard>,
    status: ArcSwap<CycleStatus>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last successfully published dashboard, if any.
    pub fn current(&self) -> Option<Arc<PublishedDashboard>> {
        self.current.load_full()
    }

    pub fn status(&self) -> Arc<CycleStatus> {
        self.status.load_full()
    }

    /// Replace the published dashboard and reset the failure streak.
    pub fn publish(&self, dashboard: Dashboard, snapshot: Arc<Snapshot>) -> Arc<PublishedDashboard> {
        let now = Utc::now();
        let published = Arc::new(PublishedDashboard {
            dashboard,
            snapshot,
            fetched_at: now,
        });
        self.current.store(Some(Arc::clone(&published)));
        self.update_status(|s| {
            s.last_success_at = Some(now);
            s.last_error = None;
            s.consecutive_failures = 0;
            s.credentials_rejected = false;
        });
        published
    }

    /// Note a failed cycle. The published dashboard is left untouched.
    pub fn record_failure(&self, error: &str) {
        let now = Utc::now();
        self.update_status(|s| {
            s.last_failure_at = Some(now);
            s.last_error = Some(error.to_string());
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        });
    }

    pub fn set_credentials_rejected(&self, rejected: bool) {
        self.update_status(|s| s.credentials_rejected = rejected);
    }

    /// Whether published data exists but is out of date.
    ///
    /// Data is stale when it is older than `refresh_interval` or when a
    /// cycle has failed since it was fetched.
    pub fn is_stale(&self, refresh_interval: Duration, now: Timestamp) -> bool {
        let Some(current) = self.current.load_full() else {
            return false;
        };
        let max_age = chrono::Duration::from_std(refresh_interval).unwrap_or(chrono::Duration::MAX);
        let too_old = now.signed_duration_since(current.fetched_at) > max_age;
        let failed_since = self
            .status
            .load()
            .last_failure_at
            .is_some_and(|failed| failed > current.fetched_at);
        too_old || failed_since
    }

    fn update_status(&self, f: impl FnOnce(&mut CycleStatus)) {
        let mut next = (**self.status.load()).clone();
        f(&mut next);
        self.status.store(Arc::new(next));
    }
}
