use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nanodc_client::TelemetryClient;
use nanodc_monitor::background::RefreshScheduler;
use nanodc_monitor::config::MonitorConfig;
use nanodc_monitor::pipeline::Pipeline;
use nanodc_monitor::published::DashboardState;
use nanodc_monitor::router::build_app_router;
use nanodc_monitor::state::AppState;
use nanodc_store::SettingsStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nanodc_monitor=info,nanodc_client=info,nanodc_core=info,nanodc_store=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = MonitorConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        api_url = %config.api_url,
        "Loaded monitor configuration"
    );

    // --- Settings ---
    let settings = Arc::new(SettingsStore::open(&config.settings_path));
    tracing::info!(
        facility_id = %settings.active_facility_id(),
        refresh_ms = settings.refresh_interval().as_millis() as u64,
        "Device settings ready"
    );

    // --- Pipeline ---
    let pipeline = Arc::new(
        Pipeline::with_overrides_file(config.overrides_path.as_deref())
            .context("Failed to load slot override tables")?,
    );

    // --- Telemetry client ---
    let client = TelemetryClient::new(
        config.client_config(settings.api_timeout()),
        settings.clone(),
    )
    .context("Failed to build HTTP client")?;

    if client.check_reachability().await {
        tracing::info!("Telemetry service reachable");
    } else {
        tracing::warn!("Telemetry service unreachable, refresh will keep retrying");
    }

    // --- Refresh scheduler ---
    let published = Arc::new(DashboardState::new());
    let (scheduler, credentials) = RefreshScheduler::new(
        client,
        Arc::clone(&settings),
        Arc::clone(&pipeline),
        Arc::clone(&published),
        config.credentials.clone(),
    );
    let cancel = tokio_util::sync::CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        settings: Arc::clone(&settings),
        pipeline,
        published,
        credentials,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), scheduler_handle).await;
    tracing::info!("Refresh scheduler stopped");

    let store = Arc::clone(&settings);
    match tokio::task::spawn_blocking(move || store.flush_if_dirty()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist usage counters on shutdown"),
        Err(e) => tracing::warn!(error = %e, "Shutdown flush task failed"),
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
