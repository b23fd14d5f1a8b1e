// Failed punch review.
//
// Purpose
// - Let a supervisor see punches the server refused, and either send them
//   again or acknowledge and drop them.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::modules::punches::queue::errors::QueueError;
use crate::shell::state::AppState;

pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.list_failed().await)
}

pub async fn retry(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let coordinator = state.coordinator.clone();
    match tokio::spawn(async move { coordinator.retry_failed(id).await }).await {
        Ok(Ok(event)) => Json(event).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(error) => {
            tracing::error!(%error, id, "retry task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn discard(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.coordinator.discard_failed(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: QueueError) -> Response {
    match error {
        QueueError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
        QueueError::InvalidTransition { .. } | QueueError::NotRemovable { .. } => {
            StatusCode::CONFLICT.into_response()
        }
        QueueError::Storage(error) => {
            tracing::error!(%error, "failed punch update not stored");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
