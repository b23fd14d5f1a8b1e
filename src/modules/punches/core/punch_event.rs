use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::modules::punches::core::punch_type::PunchType;
use crate::modules::punches::core::sync_state::SyncState;

/// A validated punch that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPunch {
    pub employee_id: String,
    pub punch_type: PunchType,
    pub timestamp: i64,
    pub context: Json,
}

/// The unit of work held by the local queue.
///
/// `timestamp` is the business time of the punch. `created_at` is when the
/// device persisted it and drives queue ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchEvent {
    pub id: u64,
    pub employee_id: String,
    #[serde(rename = "type")]
    pub punch_type: PunchType,
    pub timestamp: i64,
    pub context: Json,
    pub sync_state: SyncState,
    pub created_at: i64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    /// When the endpoint rejected the punch; retention of failed punches
    /// counts from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<i64>,
}

impl PunchEvent {
    pub fn from_new(id: u64, created_at: i64, punch: NewPunch) -> Self {
        Self {
            id,
            employee_id: punch.employee_id,
            punch_type: punch.punch_type,
            timestamp: punch.timestamp,
            context: punch.context,
            sync_state: SyncState::Pending,
            created_at,
            attempts: 0,
            last_error: None,
            failed_at: None,
        }
    }

    /// Key the queue is ordered by.
    pub fn order_key(&self) -> (i64, u64) {
        (self.created_at, self.id)
    }
}

#[cfg(test)]
mod punch_event_tests {
    use super::*;
    use crate::tests::fixtures::new_punch;
    use rstest::rstest;

    #[rstest]
    fn it_should_start_pending_without_attempts() {
        let event = PunchEvent::from_new(7, 1_700_000_000_500, new_punch("e1", PunchType::ClockIn));
        assert_eq!(event.id, 7);
        assert_eq!(event.sync_state, SyncState::Pending);
        assert_eq!(event.attempts, 0);
        assert_eq!(event.last_error, None);
        assert_eq!(event.failed_at, None);
        assert_eq!(event.order_key(), (1_700_000_000_500, 7));
    }

    #[rstest]
    fn it_should_serialize_the_punch_type_under_the_type_key() {
        let event = PunchEvent::from_new(1, 0, new_punch("e1", PunchType::ClockOut));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "clock_out");
        assert_eq!(json["sync_state"], "pending");
    }
}
