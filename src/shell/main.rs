use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use punch_sync::modules::connectivity::monitor::ConnectivityMonitor;
use punch_sync::modules::punches::adapters::outbound::acceptance::PunchAcceptance;
use punch_sync::modules::punches::adapters::outbound::acceptance::http::HttpAcceptance;
use punch_sync::modules::punches::adapters::outbound::punch_journal::file::FileJournal;
use punch_sync::modules::punches::queue::punch_queue::PunchQueue;
use punch_sync::modules::punches::sync::coordinator::SyncCoordinator;
use punch_sync::modules::punches::use_cases::report_backlog::reporter::QueueDepthReporter;
use punch_sync::shared::infrastructure::reachability::ReachabilityProbe;
use punch_sync::shared::infrastructure::reachability::http::HttpProbe;
use punch_sync::shared::infrastructure::reachability::signal::SignalProbe;
use punch_sync::shell::config::Config;
use punch_sync::shell::http::router;
use punch_sync::shell::state::AppState;
use punch_sync::shell::workers::{SyncWorkerSettings, spawn_sync_worker};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let journal = FileJournal::open(config.queue_path.clone())
        .await
        .with_context(|| format!("opening punch queue at {}", config.queue_path.display()))?;
    let queue = Arc::new(
        PunchQueue::open(Arc::new(journal))
            .await
            .context("replaying punch queue")?,
    );

    let endpoint: Arc<dyn PunchAcceptance> = Arc::new(
        HttpAcceptance::new(&config.endpoint_url, config.delivery_timeout)
            .context("building acceptance client")?,
    );

    let probe: Arc<dyn ReachabilityProbe> = match &config.probe_url {
        Some(url) => Arc::new(
            HttpProbe::new(url.clone(), PROBE_TIMEOUT)
                .context("building reachability probe")?,
        ),
        None => Arc::new(SignalProbe::new(true)),
    };
    let initial = probe.is_reachable().await;
    let monitor = Arc::new(ConnectivityMonitor::new(initial, config.debounce));
    tokio::spawn(monitor.clone().watch(probe, config.probe_interval));

    let coordinator = Arc::new(
        SyncCoordinator::new(queue.clone(), endpoint, monitor.clone())
            .with_delivery_ceiling(config.delivery_timeout),
    );
    let worker = spawn_sync_worker(
        coordinator.clone(),
        SyncWorkerSettings {
            retry_base: config.retry_base,
            retry_max: config.retry_max,
            sweep_interval: config.sweep_interval,
            failed_retention: config.failed_retention,
        },
    );

    let state = AppState {
        coordinator,
        reporter: Arc::new(QueueDepthReporter::new(queue.clone(), monitor)),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        device_id = %queue.device_id(),
        online = initial,
        "punch sync agent listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("serving http")?;

    worker.abort();
    tracing::info!(backlog = queue.count().await, "punch sync agent stopped");
    Ok(())
}
