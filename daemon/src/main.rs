// Daemon binary entry point
// Loads settings and the job file, then keeps the orchestrator running until
// SIGINT/SIGTERM. SIGHUP reloads the job file.

use anyhow::Result;
use common::config::Settings;
use common::config_store::ConfigStore;
use common::events::{LogSubscriber, MetricsSubscriber};
use common::executor::TokioProcessLauncher;
use common::models::SyncJob;
use common::telemetry;
use common::SyncOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(
        &settings.observability.log_level,
        settings.observability.log_format,
    )?;

    info!(tool = %settings.sync.tool, "Starting rsync-tray daemon");

    if let Some(port) = settings.observability.metrics_port {
        telemetry::init_metrics(port)?;
        info!(port, "Metrics exporter listening");
    }

    let store = ConfigStore::new(settings.sync.jobs_file_path());
    let orchestrator = Arc::new(SyncOrchestrator::new(
        settings.sync.tool.clone(),
        Arc::new(TokioProcessLauncher::new()),
    ));
    orchestrator.subscribe(LogSubscriber);
    orchestrator.subscribe(MetricsSubscriber);
    orchestrator.load_jobs(load_valid_jobs(&store).await);

    info!(
        jobs_file = %store.path().display(),
        jobs = orchestrator.list_jobs().len(),
        scheduled = orchestrator.scheduled_jobs().len(),
        "Sync jobs loaded"
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let initial_sync = settings.sync.sync_on_start.then(|| {
        spawn_initial_sync(
            orchestrator.clone(),
            Duration::from_secs(settings.sync.initial_sync_delay_seconds),
            shutdown_tx.subscribe(),
        )
    });

    serve(&orchestrator, &store).await?;

    info!("Waiting for in-flight syncs to complete");
    let _ = shutdown_tx.send(());
    if let Some(handle) = initial_sync {
        if let Err(e) = handle.await {
            error!(error = %e, "Initial sync task failed");
        }
    }
    orchestrator.shutdown().await;

    info!("rsync-tray daemon stopped");
    Ok(())
}

/// Read the job file, dropping jobs that fail validation
async fn load_valid_jobs(store: &ConfigStore) -> Vec<SyncJob> {
    store
        .load()
        .await
        .into_iter()
        .filter(|job| match job.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(job_name = %job.name, error = %e, "Skipping invalid sync job");
                false
            }
        })
        .collect()
}

/// Run every job once after `delay`, unless shutdown comes first
fn spawn_initial_sync(
    orchestrator: Arc<SyncOrchestrator>,
    delay: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                info!("Running initial sync of all jobs");
                orchestrator.run_all().await;
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown before initial sync, skipping it");
            }
        }
    })
}

/// Handle signals until a shutdown signal arrives
async fn serve(orchestrator: &SyncOrchestrator, store: &ConfigStore) -> Result<()> {
    #[cfg(unix)]
    let mut hangup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!("Daemon is running. Press Ctrl+C to shutdown gracefully");

    loop {
        #[cfg(unix)]
        let reload = hangup.recv();
        #[cfg(not(unix))]
        let reload = std::future::pending::<Option<()>>();

        tokio::select! {
            signal = &mut shutdown => {
                let name = signal?;
                info!(signal = name, "Shutdown signal received, initiating graceful shutdown");
                return Ok(());
            }
            _ = reload => {
                info!("Received SIGHUP, reloading sync jobs");
                orchestrator.load_jobs(load_valid_jobs(store).await);
            }
        }
    }
}

async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    let terminate = {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        async move {
            terminate.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate => Ok("SIGTERM"),
    }
}
