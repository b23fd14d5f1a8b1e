// Acceptance endpoint port.
//
// Purpose
// - Describe how a queued punch is handed to the remote service that owns
//   time registration, without tying the coordinator to a transport.
//
// Responsibilities
// - Carry the punch with its idempotency key so a retried delivery is applied
//   at most once on the server.
// - Classify every attempt as accepted, retryable or rejected. Transport
//   failures are outcomes, not errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::modules::punches::core::punch_event::PunchEvent;
use crate::modules::punches::core::punch_type::PunchType;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub id: u64,
    pub idempotency_key: String,
    pub employee_id: String,
    #[serde(rename = "type")]
    pub punch_type: PunchType,
    pub timestamp: i64,
    pub context: Json,
}

impl DeliveryRequest {
    pub fn for_event(device_id: &str, event: &PunchEvent) -> Self {
        Self {
            id: event.id,
            idempotency_key: idempotency_key(device_id, event.id),
            employee_id: event.employee_id.clone(),
            punch_type: event.punch_type,
            timestamp: event.timestamp,
            context: event.context.clone(),
        }
    }
}

/// Ids are unique per device only, so the key is scoped by the device.
pub fn idempotency_key(device_id: &str, id: u64) -> String {
    format!("{device_id}:{id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// `duplicate` is set when the endpoint had already applied this key.
    Accepted { duplicate: bool },
    /// Timeout, connection reset, 5xx. Safe to resend later.
    Retryable(String),
    /// The endpoint refused the punch itself. Resending will not help.
    Rejected(String),
}

#[async_trait]
pub trait PunchAcceptance: Send + Sync {
    async fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome;
}

pub mod http;
pub mod in_memory;
