// Sync coordinator.
//
// Purpose
// - The only component that moves punches toward `synced`.
//
// Responsibilities
// - Validate and persist punches coming from the UI, then try to deliver them
//   behind any older backlog.
// - Drain the queue in creation order: stop on a retryable failure so nothing
//   overtakes a stuck punch, skip past rejected punches so one bad punch does
//   not block the rest.
// - Keep drains from overlapping, folding concurrent triggers into the
//   running one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::modules::connectivity::monitor::ConnectivityMonitor;
use crate::modules::punches::adapters::outbound::acceptance::{
    DeliveryOutcome, DeliveryRequest, PunchAcceptance,
};
use crate::modules::punches::core::punch_event::PunchEvent;
use crate::modules::punches::core::punch_intent::{PunchIntent, ValidationError};
use crate::modules::punches::core::sync_state::SyncState;
use crate::modules::punches::queue::errors::QueueError;
use crate::modules::punches::queue::punch_queue::PunchQueue;
use crate::modules::punches::sync::drain_report::{DrainReport, DrainStop};
use crate::shared::core::primitives::now_millis;

pub const DEFAULT_DELIVERY_CEILING: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RecordPunchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] QueueError),
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncCoordinator {
    queue: Arc<PunchQueue>,
    endpoint: Arc<dyn PunchAcceptance>,
    monitor: Arc<ConnectivityMonitor>,
    draining: AtomicBool,
    rerun_requested: AtomicBool,
    delivery_ceiling: Duration,
}

impl SyncCoordinator {
    pub fn new(
        queue: Arc<PunchQueue>,
        endpoint: Arc<dyn PunchAcceptance>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            queue,
            endpoint,
            monitor,
            draining: AtomicBool::new(false),
            rerun_requested: AtomicBool::new(false),
            delivery_ceiling: DEFAULT_DELIVERY_CEILING,
        }
    }

    pub fn with_delivery_ceiling(mut self, ceiling: Duration) -> Self {
        self.delivery_ceiling = ceiling;
        self
    }

    pub fn queue(&self) -> &Arc<PunchQueue> {
        &self.queue
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Records one punch action.
    ///
    /// The punch is always persisted first; the queue serializes appends, so ids
    /// and creation times follow submission order. When online, a drain runs
    /// right away and the returned punch carries its state after that attempt.
    pub async fn record_punch(&self, intent: PunchIntent) -> Result<PunchEvent, RecordPunchError> {
        let punch = intent.validate(now_millis())?;
        let event = self.queue.append(punch).await?;
        let online = self.monitor.current();
        tracing::info!(
            id = event.id,
            employee_id = %event.employee_id,
            punch_type = %event.punch_type,
            online,
            "punch recorded"
        );
        if !online {
            return Ok(event);
        }
        self.drain().await;
        Ok(self.latest(event).await)
    }

    async fn latest(&self, event: PunchEvent) -> PunchEvent {
        match self.queue.get(event.id).await {
            Some(current) => current,
            // Only synced punches leave the queue on their own.
            None => PunchEvent {
                sync_state: SyncState::Synced,
                ..event
            },
        }
    }

    fn try_begin(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| DrainGuard(&self.draining))
    }

    /// Delivers pending punches in creation order until the queue is empty,
    /// a retryable failure occurs, or connectivity drops.
    pub async fn drain(&self) -> DrainReport {
        let mut guard = match self.try_begin() {
            Some(guard) => guard,
            None => {
                self.rerun_requested.store(true, Ordering::SeqCst);
                // The running drain may have released before it saw the request.
                match self.try_begin() {
                    Some(guard) => guard,
                    None => {
                        tracing::debug!("drain already running, trigger coalesced");
                        return DrainReport::stopped(DrainStop::AlreadyRunning);
                    }
                }
            }
        };

        let mut report = DrainReport::default();
        loop {
            self.rerun_requested.store(false, Ordering::SeqCst);
            self.drain_pass(&mut report).await;
            if matches!(report.stop, DrainStop::StorageFailure { .. }) {
                break;
            }
            if self.rerun_requested.load(Ordering::SeqCst) {
                tracing::debug!("running coalesced drain pass");
                continue;
            }
            drop(guard);
            if !self.rerun_requested.load(Ordering::SeqCst) {
                break;
            }
            match self.try_begin() {
                Some(next) => guard = next,
                None => break,
            }
        }

        tracing::info!(
            delivered = report.delivered,
            rejected = report.rejected,
            stop = ?report.stop,
            "drain finished"
        );
        report
    }

    async fn drain_pass(&self, report: &mut DrainReport) {
        match self.queue.requeue_in_flight().await {
            Ok(0) => {}
            Ok(stale) => tracing::warn!(stale, "reset stale in-flight punches"),
            Err(error) => return Self::storage_failure(report, error),
        }

        let pending = self
            .queue
            .list_pending()
            .await
            .into_iter()
            .filter(|event| event.sync_state == SyncState::Pending);

        for event in pending {
            if !self.monitor.current() {
                report.stop = DrainStop::WentOffline;
                return;
            }
            match self.queue.mark_state(event.id, SyncState::InFlight).await {
                Ok(_) => {}
                Err(QueueError::Storage(error)) => {
                    return Self::storage_failure(report, QueueError::Storage(error));
                }
                Err(error) => {
                    tracing::warn!(id = event.id, %error, "punch changed under drain, skipped");
                    continue;
                }
            }

            let result = match self.deliver(&event).await {
                DeliveryOutcome::Accepted { duplicate } => {
                    tracing::info!(id = event.id, duplicate, "punch synced");
                    report.delivered += 1;
                    match self.queue.mark_state(event.id, SyncState::Synced).await {
                        Ok(_) => self.queue.remove(event.id).await,
                        Err(error) => Err(error),
                    }
                }
                DeliveryOutcome::Retryable(reason) => {
                    tracing::warn!(id = event.id, %reason, "punch delivery failed, will retry");
                    if let Err(error) = self
                        .queue
                        .record_attempt_failure(event.id, SyncState::Pending, reason.clone())
                        .await
                    {
                        return Self::storage_failure(report, error);
                    }
                    report.stop = DrainStop::RetryableFailure {
                        id: event.id,
                        reason,
                    };
                    return;
                }
                DeliveryOutcome::Rejected(reason) => {
                    tracing::error!(id = event.id, %reason, "punch rejected by endpoint");
                    report.rejected += 1;
                    self.queue
                        .record_attempt_failure(event.id, SyncState::Failed, reason)
                        .await
                        .map(|_| ())
                }
            };
            if let Err(error) = result {
                return Self::storage_failure(report, error);
            }
        }
        report.stop = DrainStop::Drained;
    }

    fn storage_failure(report: &mut DrainReport, error: QueueError) {
        tracing::error!(%error, "drain stopped on storage failure");
        report.stop = DrainStop::StorageFailure {
            reason: error.to_string(),
        };
    }

    /// Sends one punch, bounded by the coordinator ceiling.
    pub async fn deliver(&self, event: &PunchEvent) -> DeliveryOutcome {
        let request = DeliveryRequest::for_event(self.queue.device_id(), event);
        match tokio::time::timeout(self.delivery_ceiling, self.endpoint.deliver(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => DeliveryOutcome::Retryable(format!(
                "delivery exceeded {}ms ceiling",
                self.delivery_ceiling.as_millis()
            )),
        }
    }

    pub async fn list_failed(&self) -> Vec<PunchEvent> {
        self.queue.list_failed().await
    }

    /// Puts a rejected punch back in line, then drains when online.
    pub async fn retry_failed(&self, id: u64) -> Result<PunchEvent, QueueError> {
        let event = self.queue.get(id).await.ok_or(QueueError::NotFound(id))?;
        if event.sync_state != SyncState::Failed {
            return Err(QueueError::InvalidTransition {
                id,
                from: event.sync_state,
                to: SyncState::Pending,
            });
        }
        let event = self.queue.mark_state(id, SyncState::Pending).await?;
        tracing::info!(id, "failed punch queued for retry");
        if self.monitor.current() {
            self.drain().await;
            return Ok(self.latest(event).await);
        }
        Ok(event)
    }

    pub async fn discard_failed(&self, id: u64) -> Result<(), QueueError> {
        self.queue.discard_failed(id).await?;
        tracing::info!(id, "failed punch acknowledged and discarded");
        Ok(())
    }

    /// Drops failed punches older than `retention`.
    pub async fn purge_expired_failures(&self, retention: Duration) -> Result<usize, QueueError> {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let purged = self
            .queue
            .purge_failed_before(now_millis().saturating_sub(retention_ms))
            .await?;
        if purged > 0 {
            tracing::info!(purged, "purged failed punches past retention");
        }
        Ok(purged)
    }
}
