// Reachability pushed by the platform.
//
// Browser online/offline events or mobile reachability callbacks call
// `set_reachable`; the probe loop samples the last value.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::shared::infrastructure::reachability::ReachabilityProbe;

pub struct SignalProbe {
    reachable: AtomicBool,
}

impl SignalProbe {
    pub fn new(initial: bool) -> Self {
        Self {
            reachable: AtomicBool::new(initial),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ReachabilityProbe for SignalProbe {
    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod signal_probe_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn it_should_report_the_last_signal() {
        let probe = SignalProbe::new(false);
        assert!(!probe.is_reachable().await);
        probe.set_reachable(true);
        assert!(probe.is_reachable().await);
    }
}
