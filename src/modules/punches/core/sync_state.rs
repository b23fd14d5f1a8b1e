use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery state of a queued punch.
///
/// `Pending -> InFlight` when a delivery attempt starts, then `InFlight -> Synced`
/// on acknowledgment, `InFlight -> Failed` on a server rejection, or back to
/// `InFlight -> Pending` on a retryable failure. A failed punch can be put back
/// to `Pending` by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    InFlight,
    Synced,
    Failed,
}

impl SyncState {
    pub fn can_transition_to(self, next: SyncState) -> bool {
        matches!(
            (self, next),
            (SyncState::Pending, SyncState::InFlight)
                | (SyncState::InFlight, SyncState::Synced)
                | (SyncState::InFlight, SyncState::Failed)
                | (SyncState::InFlight, SyncState::Pending)
                | (SyncState::Failed, SyncState::Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::InFlight => "in_flight",
            SyncState::Synced => "synced",
            SyncState::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
