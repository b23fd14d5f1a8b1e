use async_graphql::{Context, Object};

use crate::modules::punches::use_cases::record_punch::inbound::graphql::GqlPunch;
use crate::modules::punches::use_cases::report_backlog::reporter::BacklogSnapshot;
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlBacklog {
    pub pending_count: u64,
    pub pending: u64,
    pub in_flight: u64,
    pub failed: u64,
    pub online: bool,
}

impl From<BacklogSnapshot> for GqlBacklog {
    fn from(s: BacklogSnapshot) -> Self {
        Self {
            pending_count: s.pending_count as u64,
            pending: s.pending as u64,
            in_flight: s.in_flight as u64,
            failed: s.failed as u64,
            online: s.online,
        }
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn pending_count(&self, context: &Context<'_>) -> u64 {
        let state = context.data_unchecked::<AppState>();
        state.reporter.pending_count().await as u64
    }

    async fn backlog(&self, context: &Context<'_>) -> GqlBacklog {
        let state = context.data_unchecked::<AppState>();
        state.reporter.snapshot().await.into()
    }

    async fn online(&self, context: &Context<'_>) -> bool {
        let state = context.data_unchecked::<AppState>();
        state.coordinator.monitor().current()
    }

    async fn failed_punches(&self, context: &Context<'_>) -> Vec<GqlPunch> {
        let state = context.data_unchecked::<AppState>();
        state
            .coordinator
            .list_failed()
            .await
            .into_iter()
            .map(GqlPunch::from)
            .collect()
    }
}
