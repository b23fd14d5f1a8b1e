// HTTP implementation of the PunchAcceptance port.
//
// Purpose
// - Deliver punches to the remote time registration service.
//
// Responsibilities
// - POST the punch as JSON with the idempotency key in a header.
// - Map status codes onto delivery outcomes: 2xx accepted, 408/425/429/5xx
//   retryable, other 4xx rejected. Transport errors are retryable.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::modules::punches::adapters::outbound::acceptance::{
    DeliveryOutcome, DeliveryRequest, IDEMPOTENCY_KEY_HEADER, PunchAcceptance,
};

const MAX_REASON_LEN: usize = 512;

#[derive(Deserialize)]
struct AcceptedBody {
    #[serde(default)]
    duplicate: bool,
}

pub struct HttpAcceptance {
    client: Client,
    punches_url: String,
}

impl HttpAcceptance {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            punches_url: format!("{}/punches", base_url.trim_end_matches('/')),
        })
    }

    pub fn punches_url(&self) -> &str {
        &self.punches_url
    }
}

pub fn classify(status: StatusCode, body: &str) -> DeliveryOutcome {
    if status.is_success() {
        let duplicate = serde_json::from_str::<AcceptedBody>(body)
            .map(|accepted| accepted.duplicate)
            .unwrap_or(false);
        return DeliveryOutcome::Accepted { duplicate };
    }
    // 408 Request Timeout, 425 Too Early, 429 Too Many Requests
    let transient = matches!(status.as_u16(), 408 | 425 | 429);
    if transient || status.is_server_error() {
        return DeliveryOutcome::Retryable(format!("endpoint returned {status}"));
    }
    if status.is_client_error() {
        let reason = body.trim();
        let reason = if reason.is_empty() {
            status.to_string()
        } else {
            reason.chars().take(MAX_REASON_LEN).collect()
        };
        return DeliveryOutcome::Rejected(reason);
    }
    DeliveryOutcome::Retryable(format!("unexpected status {status}"))
}

#[async_trait::async_trait]
impl PunchAcceptance for HttpAcceptance {
    async fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        let response = self
            .client
            .post(&self.punches_url)
            .header(IDEMPOTENCY_KEY_HEADER, &request.idempotency_key)
            .json(request)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(id = request.id, %error, "punch delivery transport error");
                return DeliveryOutcome::Retryable(format!("transport error: {error}"));
            }
        };
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify(status, &body)
    }
}

#[cfg(test)]
mod punch_http_acceptance_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::OK, "", DeliveryOutcome::Accepted { duplicate: false })]
    #[case(StatusCode::CREATED, "{\"duplicate\":false}", DeliveryOutcome::Accepted { duplicate: false })]
    #[case(StatusCode::OK, "{\"duplicate\":true}", DeliveryOutcome::Accepted { duplicate: true })]
    #[case(StatusCode::NO_CONTENT, "", DeliveryOutcome::Accepted { duplicate: false })]
    fn it_should_accept_success_statuses(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: DeliveryOutcome,
    ) {
        assert_eq!(classify(status, body), expected);
    }

    #[rstest]
    #[case(StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(StatusCode::BAD_GATEWAY)]
    #[case(StatusCode::SERVICE_UNAVAILABLE)]
    #[case(StatusCode::REQUEST_TIMEOUT)]
    #[case(StatusCode::TOO_MANY_REQUESTS)]
    fn it_should_retry_transient_statuses(#[case] status: StatusCode) {
        assert!(matches!(
            classify(status, "busy"),
            DeliveryOutcome::Retryable(_)
        ));
    }

    #[rstest]
    fn it_should_reject_client_errors_with_the_body_as_reason() {
        assert_eq!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, " unknown employee \n"),
            DeliveryOutcome::Rejected("unknown employee".into())
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, ""),
            DeliveryOutcome::Rejected("400 Bad Request".into())
        );
    }

    #[rstest]
    fn it_should_build_the_punches_url_from_the_base_url() {
        let endpoint =
            HttpAcceptance::new("https://time.example.com/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(endpoint.punches_url(), "https://time.example.com/api/punches");
    }
}
