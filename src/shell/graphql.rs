use async_graphql::{EmptySubscription, Schema};

pub use crate::modules::punches::use_cases::record_punch::inbound::graphql::MutationRoot;
pub use crate::modules::punches::use_cases::report_backlog::inbound::graphql::QueryRoot;
use crate::shell::state::AppState;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}
