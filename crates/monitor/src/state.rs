use std::sync::Arc;

use nanodc_store::SettingsStore;

use crate::background::CredentialsHandle;
use crate::config::MonitorConfig;
use crate::pipeline::Pipeline;
use crate::published::DashboardState;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MonitorConfig>,
    pub settings: Arc<SettingsStore>,
    pub pipeline: Arc<Pipeline>,
    /// Written only by the refresh scheduler.
    pub published: Arc<DashboardState>,
    pub credentials: CredentialsHandle,
}
