use axum::{
    Json, extract::State, extract::rejection::JsonRejection, http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::modules::punches::core::punch_intent::PunchIntent;
use crate::modules::punches::core::sync_state::SyncState;
use crate::modules::punches::sync::coordinator::RecordPunchError;
use crate::shell::state::AppState;

#[derive(Serialize)]
pub struct ValidationErrorBody {
    pub error: String,
}

pub async fn handle(
    State(state): State<AppState>,
    body: Result<Json<PunchIntent>, JsonRejection>,
) -> impl IntoResponse {
    let Json(intent) = match body {
        Ok(b) => b,
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };

    // Runs detached so a dropped request cannot interrupt a delivery mid-way.
    let coordinator = state.coordinator.clone();
    let recorded = tokio::spawn(async move { coordinator.record_punch(intent).await }).await;

    match recorded {
        Ok(Ok(event)) => {
            let status = match event.sync_state {
                SyncState::Synced => StatusCode::CREATED,
                SyncState::Failed => StatusCode::UNPROCESSABLE_ENTITY,
                SyncState::Pending | SyncState::InFlight => StatusCode::ACCEPTED,
            };
            (status, Json(event)).into_response()
        }
        Ok(Err(RecordPunchError::Validation(error))) => (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorBody {
                error: error.to_string(),
            }),
        )
            .into_response(),
        Ok(Err(RecordPunchError::Storage(error))) => {
            tracing::error!(%error, "punch could not be stored");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(error) => {
            tracing::error!(%error, "record punch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod record_punch_http_inbound_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::post,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::modules::punches::adapters::outbound::acceptance::DeliveryOutcome;
    use crate::modules::punches::adapters::outbound::acceptance::in_memory::ScriptedResponse;
    use crate::shell::state::AppState;
    use crate::tests::fixtures::TestHarness;

    use super::handle;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/punches", post(handle))
            .with_state(state)
    }

    fn punch_request(body: &'static str) -> Request<Body> {
        Request::post("/punches")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn it_should_return_202_with_the_queued_punch_while_offline() {
        let harness = TestHarness::new().await;
        let response = app(harness.state())
            .oneshot(punch_request(
                r#"{"employee_id":"e1","type":"clock_in","context":{"source":"qr"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["type"], "clock_in");
        assert_eq!(json["sync_state"], "pending");
        assert_eq!(harness.queue.count().await, 1);
    }

    #[tokio::test]
    async fn it_should_return_201_when_the_punch_synced_right_away() {
        let harness = TestHarness::new().await;
        harness.go_online();
        let response = app(harness.state())
            .oneshot(punch_request(r#"{"employee_id":"e1","type":"clock_out"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(harness.endpoint.applied().await.len(), 1);
    }

    #[tokio::test]
    async fn it_should_return_422_when_the_server_rejects_the_punch() {
        let harness = TestHarness::new().await;
        harness
            .endpoint
            .script(ScriptedResponse::Outcome(DeliveryOutcome::Rejected(
                "unknown project".into(),
            )))
            .await;
        harness.go_online();
        let response = app(harness.state())
            .oneshot(punch_request(r#"{"employee_id":"e1","type":"clock_in"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["sync_state"], "failed");
        assert_eq!(json["last_error"], "unknown project");
    }

    #[tokio::test]
    async fn it_should_return_400_on_an_unknown_punch_type() {
        let harness = TestHarness::new().await;
        let response = app(harness.state())
            .oneshot(punch_request(r#"{"employee_id":"e1","type":"break"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "unknown punch type: \"break\"");
        assert_eq!(harness.queue.count().await, 0);
    }

    #[tokio::test]
    async fn it_should_return_422_on_invalid_json() {
        let harness = TestHarness::new().await;
        let response = app(harness.state())
            .oneshot(punch_request("not-json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn it_should_return_500_when_the_journal_is_offline() {
        let harness = TestHarness::new().await;
        harness.journal.toggle_offline();
        let response = app(harness.state())
            .oneshot(punch_request(r#"{"employee_id":"e1","type":"clock_in"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
