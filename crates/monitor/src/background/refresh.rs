//! Periodic snapshot refresh.
//!
//! One task fetches a snapshot, resolves the active facility against it and
//! publishes the result. Cycles never overlap: the ticker skips ticks that
//! were missed while a cycle was still running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use nanodc_client::{AuthError, AuthToken, Credentials, FetchError, TelemetryClient};
use nanodc_core::facility::FacilityConfiguration;
use nanodc_core::snapshot::Snapshot;
use nanodc_store::SettingsStore;

use crate::pipeline::Pipeline;
use crate::published::DashboardState;

/// Replaces the credentials used by a running scheduler.
#[derive(Clone)]
pub struct CredentialsHandle(Arc<watch::Sender<Credentials>>);

impl CredentialsHandle {
    /// Supply new credentials. The next cycle re-authenticates with them,
    /// even if the previous set was rejected.
    pub fn replace(&self, credentials: Credentials) {
        tracing::info!(user_id = %credentials.user_id, "Credentials replaced");
        self.0.send_replace(credentials);
    }
}

/// Why a cycle did not publish.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CycleFailure {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Snapshot fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cycle exceeded the {}s fetch timeout", .0.as_secs())]
    TimedOut(Duration),
}

/// Result of one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A new dashboard was published.
    Published { facility_id: String, filled: usize },
    /// Nothing was published; the previous dashboard stays visible.
    Failed(CycleFailure),
    /// Skipped because the credentials were rejected and not yet replaced.
    Suspended,
}

pub struct RefreshScheduler {
    client: TelemetryClient,
    settings: Arc<SettingsStore>,
    pipeline: Arc<Pipeline>,
    published: Arc<DashboardState>,
    credentials: watch::Receiver<Credentials>,
    token: Option<AuthToken>,
    suspended: bool,
}

impl RefreshScheduler {
    pub fn new(
        client: TelemetryClient,
        settings: Arc<SettingsStore>,
        pipeline: Arc<Pipeline>,
        published: Arc<DashboardState>,
        credentials: Credentials,
    ) -> (Self, CredentialsHandle) {
        let (tx, rx) = watch::channel(credentials);
        let scheduler = Self {
            client,
            settings,
            pipeline,
            published,
            credentials: rx,
            token: None,
            suspended: false,
        };
        (scheduler, CredentialsHandle(Arc::new(tx)))
    }

    /// Run cycles on the configured interval until `cancel` fires.
    ///
    /// The interval is re-read after every cycle; a change takes effect
    /// from the next tick. A cycle in flight when `cancel` fires is dropped
    /// without publishing.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut period = self.settings.refresh_interval();
        let mut ticker = build_ticker(Instant::now(), period);

        tracing::info!(interval_ms = period.as_millis() as u64, "Refresh scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Refresh scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let started = Instant::now();
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::info!("Refresh scheduler stopping, in-flight cycle dropped");
                            break;
                        }
                        _ = self.run_cycle() => {}
                    }

                    if started.elapsed() > period {
                        tracing::debug!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            interval_ms = period.as_millis() as u64,
                            "Cycle overran the refresh interval, missed ticks skipped"
                        );
                    }

                    let next = self.settings.refresh_interval();
                    if next != period {
                        tracing::info!(
                            from_ms = period.as_millis() as u64,
                            to_ms = next.as_millis() as u64,
                            "Refresh interval changed"
                        );
                        period = next;
                        ticker = build_ticker(Instant::now() + period, period);
                    }
                }
            }
        }
    }

    /// Run one fetch, resolve and publish pass.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.pick_up_new_credentials();
        if self.suspended {
            tracing::debug!("Cycle skipped, credentials were rejected");
            return CycleOutcome::Suspended;
        }

        // The facility is fixed for the whole pass; a switch made while the
        // fetch is in flight applies to the next cycle.
        let facility_id = self.settings.active_facility_id();
        let config = self.pipeline.registry().set_active(&facility_id);
        let timeout = self.settings.api_timeout();

        tracing::debug!(facility_id = %config.facility_id, "Cycle started");

        let fetched = match tokio::time::timeout(timeout, self.fetch(&config)).await {
            Ok(result) => result,
            Err(_) => Err(CycleFailure::TimedOut(timeout)),
        };

        let outcome = match fetched {
            Ok(snapshot) => self.publish(&config, snapshot),
            Err(failure) => self.fail(failure),
        };

        let synced = matches!(outcome, CycleOutcome::Published { .. });
        self.persist_settings(synced).await;
        outcome
    }

    // ---- private helpers ----

    fn pick_up_new_credentials(&mut self) {
        if self.credentials.has_changed().unwrap_or(false) {
            let _ = self.credentials.borrow_and_update();
            self.token = None;
            if self.suspended {
                tracing::info!("New credentials supplied, resuming refresh");
            }
            self.suspended = false;
            self.published.set_credentials_rejected(false);
        }
    }

    async fn fetch(&mut self, config: &FacilityConfiguration) -> Result<Snapshot, CycleFailure> {
        let token = match &self.token {
            Some(token) => token.clone(),
            None => {
                let credentials = self.credentials.borrow().clone();
                let token = self.client.authenticate(&credentials).await?;
                self.token = Some(token.clone());
                token
            }
        };

        match self
            .client
            .fetch_snapshot_scoped(&token, config.nanodc_id.as_deref())
            .await
        {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                if matches!(e, FetchError::Unauthorized(_)) {
                    tracing::info!("Token rejected, will re-authenticate next cycle");
                    self.token = None;
                }
                Err(e.into())
            }
        }
    }

    fn publish(&self, config: &FacilityConfiguration, snapshot: Snapshot) -> CycleOutcome {
        let dashboard = self.pipeline.assemble(config, &snapshot);
        let filled = dashboard.filled();
        let slots = dashboard.entries.len();
        self.published.publish(dashboard, Arc::new(snapshot));

        tracing::info!(
            facility_id = %config.facility_id,
            filled,
            slots,
            "Cycle finished, dashboard published"
        );
        CycleOutcome::Published {
            facility_id: config.facility_id.clone(),
            filled,
        }
    }

    /// Record the sync time after a publish and flush usage counters, off
    /// the runtime threads.
    async fn persist_settings(&self, synced: bool) {
        let settings = Arc::clone(&self.settings);
        let result = tokio::task::spawn_blocking(move || {
            if synced {
                settings.mark_synced()?;
            }
            settings.flush_if_dirty()
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist settings after cycle"),
            Err(e) => tracing::warn!(error = %e, "Settings persist task failed"),
        }
    }

    fn fail(&mut self, failure: CycleFailure) -> CycleOutcome {
        if let CycleFailure::Auth(e) = &failure {
            if e.is_terminal() {
                self.suspended = true;
                self.published.set_credentials_rejected(true);
                tracing::error!(
                    "Credentials rejected, refresh suspended until new credentials are supplied"
                );
            }
        }
        self.published.record_failure(&failure.to_string());
        let consecutive = self.published.status().consecutive_failures;
        tracing::warn!(
            error = %failure,
            consecutive_failures = consecutive,
            "Cycle failed, keeping last published dashboard"
        );
        CycleOutcome::Failed(failure)
    }
}

fn build_ticker(start: Instant, period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
