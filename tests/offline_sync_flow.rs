mod common;

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use tempfile::TempDir;

use punch_sync::modules::punches::adapters::outbound::acceptance::DeliveryOutcome;
use punch_sync::modules::punches::adapters::outbound::acceptance::in_memory::{
    InMemoryAcceptance, ScriptedResponse,
};
use punch_sync::modules::punches::core::punch_type::PunchType;
use punch_sync::modules::punches::core::sync_state::SyncState;
use punch_sync::shell::workers::{SyncWorkerSettings, spawn_sync_worker};

use common::{Device, eventually};

fn settings() -> SyncWorkerSettings {
    SyncWorkerSettings {
        retry_base: Duration::from_secs(60),
        retry_max: Duration::from_secs(60),
        sweep_interval: Duration::from_secs(60),
        failed_retention: Duration::from_secs(3600),
    }
}

#[rstest]
#[tokio::test]
async fn it_should_sync_a_punch_recorded_offline_once_back_online() {
    let dir = TempDir::new().unwrap();
    let endpoint = Arc::new(InMemoryAcceptance::new());
    let device = Device::open(dir.path(), endpoint.clone(), false).await;
    let worker = spawn_sync_worker(device.coordinator.clone(), settings());

    device.punch("e1", "clock_in").await;
    assert_eq!(device.reporter.pending_count().await, 1);

    device.monitor.observe(true);
    eventually(|| async { device.reporter.pending_count().await == 0 }).await;
    assert_eq!(endpoint.applied().await.len(), 1);
    worker.abort();
}

#[rstest]
#[tokio::test]
async fn it_should_deliver_an_employees_punches_in_recorded_order() {
    let dir = TempDir::new().unwrap();
    let endpoint = Arc::new(InMemoryAcceptance::new());
    let device = Device::open(dir.path(), endpoint.clone(), false).await;

    device.punch("e1", "clock_in").await;
    device.punch("e2", "clock_in").await;
    device.punch("e1", "lunch_start").await;
    device.punch("e1", "lunch_end").await;
    device.punch("e1", "clock_out").await;

    device.monitor.observe(true);
    let report = device.coordinator.drain().await;
    assert_eq!(report.delivered, 5);

    let applied = endpoint.applied().await;
    let e1: Vec<PunchType> = applied
        .iter()
        .filter(|request| request.employee_id == "e1")
        .map(|request| request.punch_type)
        .collect();
    assert_eq!(
        e1,
        vec![
            PunchType::ClockIn,
            PunchType::LunchStart,
            PunchType::LunchEnd,
            PunchType::ClockOut
        ]
    );
    let ids: Vec<u64> = applied.iter().map(|request| request.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[rstest]
#[tokio::test]
async fn it_should_hold_a_punch_after_a_retryable_failure_until_the_next_reconnect() {
    let dir = TempDir::new().unwrap();
    let endpoint = Arc::new(InMemoryAcceptance::new());
    let device = Device::open(dir.path(), endpoint.clone(), false).await;
    let worker = spawn_sync_worker(device.coordinator.clone(), settings());

    device.punch("e1", "clock_in").await;
    device.punch("e1", "clock_out").await;
    endpoint
        .script(ScriptedResponse::Outcome(DeliveryOutcome::Retryable(
            "connection refused".into(),
        )))
        .await;

    device.monitor.observe(true);
    eventually(|| async { endpoint.attempts() == 1 }).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(endpoint.attempts(), 1);
    assert_eq!(device.reporter.pending_count().await, 2);
    assert_eq!(
        device.queue.get(1).await.unwrap().sync_state,
        SyncState::Pending
    );

    device.monitor.observe(false);
    device.monitor.observe(true);
    eventually(|| async { device.reporter.pending_count().await == 0 }).await;
    assert_eq!(endpoint.applied().await.len(), 2);
    worker.abort();
}

#[rstest]
#[tokio::test]
async fn it_should_keep_delivering_past_a_poison_punch() {
    let dir = TempDir::new().unwrap();
    let endpoint = Arc::new(InMemoryAcceptance::new());
    endpoint.block_employee("ghost").await;
    let device = Device::open(dir.path(), endpoint.clone(), false).await;

    device.punch("e1", "clock_in").await;
    device.punch("ghost", "clock_in").await;
    device.punch("e1", "clock_out").await;

    device.monitor.observe(true);
    let report = device.coordinator.drain().await;
    assert_eq!(report.delivered, 2);
    assert_eq!(report.rejected, 1);

    let snapshot = device.reporter.snapshot().await;
    assert_eq!(snapshot.pending_count, 1);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.pending, 0);
}
