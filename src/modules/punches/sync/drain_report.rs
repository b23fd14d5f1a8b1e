use serde::Serialize;

/// Why a drain stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrainStop {
    /// No pending punch left.
    Drained,
    /// Delivery of `id` failed transiently; later punches were held back.
    RetryableFailure { id: u64, reason: String },
    WentOffline,
    /// Another drain was running; this trigger was folded into it.
    AlreadyRunning,
    StorageFailure { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub delivered: usize,
    pub rejected: usize,
    pub stop: DrainStop,
}

impl Default for DrainReport {
    fn default() -> Self {
        Self {
            delivered: 0,
            rejected: 0,
            stop: DrainStop::Drained,
        }
    }
}

impl DrainReport {
    pub fn stopped(stop: DrainStop) -> Self {
        Self {
            stop,
            ..Self::default()
        }
    }

    pub fn halted_on_retryable(&self) -> bool {
        matches!(self.stop, DrainStop::RetryableFailure { .. })
    }
}

#[cfg(test)]
mod drain_report_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_serialize_the_stop_reason_with_a_kind_tag() {
        let report = DrainReport {
            delivered: 2,
            rejected: 1,
            stop: DrainStop::RetryableFailure {
                id: 4,
                reason: "timeout".into(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop"]["kind"], "retryable_failure");
        assert_eq!(json["stop"]["id"], 4);
        assert!(report.halted_on_retryable());
        assert!(!DrainReport::default().halted_on_retryable());
    }
}
