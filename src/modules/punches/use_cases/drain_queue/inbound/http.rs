use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::shell::state::AppState;

/// Runs a drain now and reports how far it got.
pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = state.coordinator.clone();
    match tokio::spawn(async move { coordinator.drain().await }).await {
        Ok(report) => Json(report).into_response(),
        Err(error) => {
            tracing::error!(%error, "drain task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
