use std::sync::Arc;

use crate::modules::punches::sync::coordinator::SyncCoordinator;
use crate::modules::punches::use_cases::report_backlog::reporter::QueueDepthReporter;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
    pub reporter: Arc<QueueDepthReporter>,
}
