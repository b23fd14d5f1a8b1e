// Background sync worker.
//
// Purpose
// - Keep draining the punch queue without the UI having to ask.
//
// Responsibilities
// - Drain once at startup, then again on every reconnect.
// - After a retryable failure, retry on an exponential backoff.
// - Otherwise sweep periodically, purging failed punches past retention.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::modules::connectivity::core::debouncer::Transition;
use crate::modules::punches::sync::coordinator::SyncCoordinator;
use crate::modules::punches::sync::drain_report::DrainStop;
use crate::shared::core::backoff::Backoff;

#[derive(Debug, Clone, Copy)]
pub struct SyncWorkerSettings {
    pub retry_base: Duration,
    pub retry_max: Duration,
    pub sweep_interval: Duration,
    pub failed_retention: Duration,
}

pub fn spawn_sync_worker(
    coordinator: Arc<SyncCoordinator>,
    settings: SyncWorkerSettings,
) -> JoinHandle<()> {
    let wake = Arc::new(Notify::new());
    let on_transition = wake.clone();
    coordinator.monitor().subscribe(move |transition| {
        if transition == Transition::WentOnline {
            on_transition.notify_one();
        }
    });

    tokio::spawn(async move {
        let mut backoff = Backoff::new(settings.retry_base, settings.retry_max);
        loop {
            let report = coordinator.drain().await;
            let wait = match report.stop {
                DrainStop::RetryableFailure { .. } | DrainStop::StorageFailure { .. } => {
                    let delay = backoff.next_delay();
                    tracing::info!(
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        failures = backoff.consecutive_failures(),
                        "sync backing off"
                    );
                    delay
                }
                _ => {
                    backoff.reset();
                    if let Err(error) = coordinator
                        .purge_expired_failures(settings.failed_retention)
                        .await
                    {
                        tracing::warn!(%error, "failed punch purge did not complete");
                    }
                    settings.sweep_interval
                }
            };

            tokio::select! {
                _ = wake.notified() => {
                    tracing::debug!("sync worker woke on reconnect");
                    backoff.reset();
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    })
}
