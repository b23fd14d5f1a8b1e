use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use serde_json::json;

use crate::modules::connectivity::monitor::ConnectivityMonitor;
use crate::modules::punches::adapters::outbound::acceptance::in_memory::InMemoryAcceptance;
use crate::modules::punches::adapters::outbound::punch_journal::in_memory::InMemoryJournal;
use crate::modules::punches::core::punch_event::NewPunch;
use crate::modules::punches::core::punch_intent::PunchIntent;
use crate::modules::punches::core::punch_type::PunchType;
use crate::modules::punches::queue::punch_queue::PunchQueue;
use crate::modules::punches::sync::coordinator::SyncCoordinator;
use crate::modules::punches::use_cases::report_backlog::reporter::QueueDepthReporter;
use crate::shell::state::AppState;

pub const PUNCHED_AT: i64 = 1_700_000_000_000;

pub fn new_punch(employee_id: &str, punch_type: PunchType) -> NewPunch {
    NewPunch {
        employee_id: employee_id.to_string(),
        punch_type,
        timestamp: PUNCHED_AT,
        context: json!({"project_id": "p-1", "site_id": "s-1", "source": "qr"}),
    }
}

pub fn intent(employee_id: &str, punch_type: &str) -> PunchIntent {
    PunchIntent::new(
        employee_id,
        punch_type,
        Some(json!({"project_id": "p-1", "source": "qr"})),
    )
}

/// Coordinator over in-memory adapters, starting offline with no debounce hold.
pub struct TestHarness {
    pub journal: Arc<InMemoryJournal>,
    pub queue: Arc<PunchQueue>,
    pub endpoint: Arc<InMemoryAcceptance>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl TestHarness {
    pub async fn new() -> Self {
        let journal = Arc::new(InMemoryJournal::new());
        let queue = Arc::new(PunchQueue::open(journal.clone()).await.unwrap());
        let endpoint = Arc::new(InMemoryAcceptance::new());
        let monitor = Arc::new(ConnectivityMonitor::new(false, Duration::ZERO));
        let coordinator = Arc::new(SyncCoordinator::new(
            queue.clone(),
            endpoint.clone(),
            monitor.clone(),
        ));
        Self {
            journal,
            queue,
            endpoint,
            monitor,
            coordinator,
        }
    }

    pub fn go_online(&self) {
        self.monitor.observe(true);
    }

    pub fn go_offline(&self) {
        self.monitor.observe(false);
    }

    pub fn state(&self) -> AppState {
        AppState {
            coordinator: self.coordinator.clone(),
            reporter: Arc::new(QueueDepthReporter::new(
                self.queue.clone(),
                self.monitor.clone(),
            )),
        }
    }
}

#[fixture]
pub async fn test_harness() -> TestHarness {
    TestHarness::new().await
}
