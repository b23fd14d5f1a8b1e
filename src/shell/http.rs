use async_graphql_axum::GraphQL;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::modules::punches::use_cases::drain_queue::inbound::http as drain_http;
use crate::modules::punches::use_cases::manage_failed_punches::inbound::http as failed_http;
use crate::modules::punches::use_cases::record_punch::inbound::http as record_http;
use crate::modules::punches::use_cases::report_backlog::inbound::http as backlog_http;
use crate::shell::graphql::schema;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    let gql = GraphQL::new(schema(state.clone()));
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/punches", post(record_http::handle))
        .route("/punches/failed", get(failed_http::list))
        .route("/punches/failed/{id}/retry", post(failed_http::retry))
        .route("/punches/failed/{id}", delete(failed_http::discard))
        .route("/backlog", get(backlog_http::handle))
        .route("/sync", post(drain_http::handle))
        .route_service("/gql", gql)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
