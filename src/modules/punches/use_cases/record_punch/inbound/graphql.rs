use async_graphql::{Context, Json, Object, Result as GqlResult};
use serde_json::Value;

use crate::modules::punches::core::punch_event::PunchEvent;
use crate::modules::punches::core::punch_intent::PunchIntent;
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlPunch {
    pub id: u64,
    pub employee_id: String,
    pub punch_type: String,
    pub timestamp: i64,
    pub context: Json<Value>,
    pub sync_state: String,
    pub created_at: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl From<PunchEvent> for GqlPunch {
    fn from(e: PunchEvent) -> Self {
        Self {
            id: e.id,
            employee_id: e.employee_id,
            punch_type: e.punch_type.as_str().to_string(),
            timestamp: e.timestamp,
            context: Json(e.context),
            sync_state: e.sync_state.as_str().to_string(),
            created_at: e.created_at,
            attempts: e.attempts,
            last_error: e.last_error,
        }
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn record_punch(
        &self,
        context: &Context<'_>,
        employee_id: String,
        punch_type: String,
        punch_context: Option<Json<Value>>,
    ) -> GqlResult<GqlPunch> {
        let state = context.data_unchecked::<AppState>();
        let intent = PunchIntent::new(employee_id, punch_type, punch_context.map(|c| c.0));

        let coordinator = state.coordinator.clone();
        let event = tokio::spawn(async move { coordinator.record_punch(intent).await })
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;

        Ok(event.into())
    }
}
