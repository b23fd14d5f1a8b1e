// In memory implementation of the PunchAcceptance port.
//
// Purpose
// - Stand in for the remote acceptance endpoint in tests and when no endpoint
//   is configured.
//
// Responsibilities
// - Apply each idempotency key once and acknowledge repeats as duplicates.
// - Replay scripted outcomes, including an applied punch whose acknowledgment
//   never reaches the device.
// - Refuse punches for blocked employees, the way a server rejects bad input.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::modules::punches::adapters::outbound::acceptance::{
    DeliveryOutcome, DeliveryRequest, PunchAcceptance,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    Outcome(DeliveryOutcome),
    /// Applies the punch, then reports a retryable failure.
    ApplyThenLoseAck,
}

#[derive(Default)]
pub struct InMemoryAcceptance {
    applied: Mutex<Vec<DeliveryRequest>>,
    seen: Mutex<HashSet<String>>,
    script: Mutex<VecDeque<ScriptedResponse>>,
    blocked_employees: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
    delay_ms: AtomicU64,
}

impl InMemoryAcceptance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next delivery attempt.
    pub async fn script(&self, response: ScriptedResponse) {
        self.script.lock().await.push_back(response);
    }

    pub async fn block_employee(&self, employee_id: impl Into<String>) {
        self.blocked_employees.lock().await.insert(employee_id.into());
    }

    pub fn set_delay_ms(&self, delay_ms: u64) {
        self.delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    /// Punches applied server side, in application order.
    pub async fn applied(&self) -> Vec<DeliveryRequest> {
        self.applied.lock().await.clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn apply(&self, request: &DeliveryRequest) -> bool {
        let first_time = self
            .seen
            .lock()
            .await
            .insert(request.idempotency_key.clone());
        if first_time {
            self.applied.lock().await.push(request.clone());
        }
        !first_time
    }
}

#[async_trait::async_trait]
impl PunchAcceptance for InMemoryAcceptance {
    async fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(ScriptedResponse::Outcome(outcome)) => outcome,
            Some(ScriptedResponse::ApplyThenLoseAck) => {
                self.apply(request).await;
                DeliveryOutcome::Retryable("acknowledgment lost".into())
            }
            None => {
                if self
                    .blocked_employees
                    .lock()
                    .await
                    .contains(&request.employee_id)
                {
                    return DeliveryOutcome::Rejected(format!(
                        "unknown employee {}",
                        request.employee_id
                    ));
                }
                let duplicate = self.apply(request).await;
                DeliveryOutcome::Accepted { duplicate }
            }
        }
    }
}

#[cfg(test)]
mod punch_in_memory_acceptance_tests {
    use super::*;
    use crate::modules::punches::core::punch_event::PunchEvent;
    use crate::modules::punches::core::punch_type::PunchType;
    use crate::tests::fixtures::new_punch;
    use rstest::{fixture, rstest};

    #[fixture]
    fn before_each() -> (InMemoryAcceptance, DeliveryRequest) {
        let event = PunchEvent::from_new(1, 0, new_punch("e1", PunchType::ClockIn));
        (
            InMemoryAcceptance::new(),
            DeliveryRequest::for_event("device-a", &event),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_apply_a_repeated_delivery_once(
        before_each: (InMemoryAcceptance, DeliveryRequest),
    ) {
        let (endpoint, request) = before_each;
        let first = endpoint.deliver(&request).await;
        let second = endpoint.deliver(&request).await;
        assert_eq!(first, DeliveryOutcome::Accepted { duplicate: false });
        assert_eq!(second, DeliveryOutcome::Accepted { duplicate: true });
        assert_eq!(endpoint.applied().await.len(), 1);
        assert_eq!(endpoint.attempts(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_apply_but_lose_the_acknowledgment(
        before_each: (InMemoryAcceptance, DeliveryRequest),
    ) {
        let (endpoint, request) = before_each;
        endpoint.script(ScriptedResponse::ApplyThenLoseAck).await;
        let lost = endpoint.deliver(&request).await;
        assert!(matches!(lost, DeliveryOutcome::Retryable(_)));
        let retried = endpoint.deliver(&request).await;
        assert_eq!(retried, DeliveryOutcome::Accepted { duplicate: true });
        assert_eq!(endpoint.applied().await.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_blocked_employees(
        before_each: (InMemoryAcceptance, DeliveryRequest),
    ) {
        let (endpoint, request) = before_each;
        endpoint.block_employee("e1").await;
        let outcome = endpoint.deliver(&request).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected("unknown employee e1".into())
        );
        assert!(endpoint.applied().await.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_return_scripted_outcomes_without_applying(
        before_each: (InMemoryAcceptance, DeliveryRequest),
    ) {
        let (endpoint, request) = before_each;
        endpoint
            .script(ScriptedResponse::Outcome(DeliveryOutcome::Retryable(
                "503".into(),
            )))
            .await;
        assert_eq!(
            endpoint.deliver(&request).await,
            DeliveryOutcome::Retryable("503".into())
        );
        assert!(endpoint.applied().await.is_empty());
    }
}
