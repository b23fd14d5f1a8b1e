#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use punch_sync::modules::connectivity::monitor::ConnectivityMonitor;
use punch_sync::modules::punches::adapters::outbound::acceptance::PunchAcceptance;
use punch_sync::modules::punches::adapters::outbound::punch_journal::file::FileJournal;
use punch_sync::modules::punches::core::punch_intent::PunchIntent;
use punch_sync::modules::punches::queue::punch_queue::PunchQueue;
use punch_sync::modules::punches::sync::coordinator::SyncCoordinator;
use punch_sync::modules::punches::use_cases::report_backlog::reporter::QueueDepthReporter;

/// One device agent over a file journal, as the binary wires it.
pub struct Device {
    pub queue: Arc<PunchQueue>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
    pub reporter: QueueDepthReporter,
}

impl Device {
    pub async fn open(dir: &Path, endpoint: Arc<dyn PunchAcceptance>, online: bool) -> Self {
        let journal = FileJournal::open(dir.join("punch-queue.jsonl"))
            .await
            .unwrap();
        let queue = Arc::new(PunchQueue::open(Arc::new(journal)).await.unwrap());
        let monitor = Arc::new(ConnectivityMonitor::new(online, Duration::ZERO));
        let coordinator = Arc::new(SyncCoordinator::new(
            queue.clone(),
            endpoint,
            monitor.clone(),
        ));
        let reporter = QueueDepthReporter::new(queue.clone(), monitor.clone());
        Self {
            queue,
            monitor,
            coordinator,
            reporter,
        }
    }

    pub async fn punch(&self, employee_id: &str, punch_type: &str) -> u64 {
        self.coordinator
            .record_punch(PunchIntent::new(employee_id, punch_type, None))
            .await
            .unwrap()
            .id
    }
}

/// Polls `check` until it holds, failing the test after five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
