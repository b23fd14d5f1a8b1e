use std::sync::Arc;

use serde::Serialize;

use crate::modules::connectivity::monitor::ConnectivityMonitor;
use crate::modules::punches::queue::punch_queue::PunchQueue;

/// What the UI shows in its "N punches waiting to sync" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BacklogSnapshot {
    pub pending_count: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub failed: usize,
    pub online: bool,
}

pub struct QueueDepthReporter {
    queue: Arc<PunchQueue>,
    monitor: Arc<ConnectivityMonitor>,
}

impl QueueDepthReporter {
    pub fn new(queue: Arc<PunchQueue>, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self { queue, monitor }
    }

    /// Punches not yet synced, failed ones included.
    pub async fn pending_count(&self) -> usize {
        self.queue.count().await
    }

    pub async fn snapshot(&self) -> BacklogSnapshot {
        let depth = self.queue.depth().await;
        BacklogSnapshot {
            pending_count: depth.total(),
            pending: depth.pending,
            in_flight: depth.in_flight,
            failed: depth.failed,
            online: self.monitor.current(),
        }
    }
}
