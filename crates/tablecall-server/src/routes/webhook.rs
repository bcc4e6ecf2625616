//! Provider Webhook Route
//!
//! The body is taken as raw bytes: the signature covers the exact bytes the
//! provider sent, so nothing may be parsed before verification.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use crate::application::{IngestError, WebhookOutcome};
use crate::models::{ProviderWebhook, WebhookAck};
use crate::signature::SIGNATURE_HEADER;
use crate::AppState;

/// Receive a lifecycle event from the voice provider
#[utoipa::path(
    post,
    path = "/webhooks/provider",
    params(
        ("x-call-signature" = String, Header, description = "v=<unix-ms>,d=<hex HMAC-SHA256 of body||timestamp>")
    ),
    request_body = ProviderWebhook,
    responses(
        (status = 204, description = "Event processed"),
        (status = 200, description = "Event acknowledged but ignored", body = WebhookAck),
        (status = 400, description = "Body is not valid JSON"),
        (status = 401, description = "Missing or invalid signature")
    ),
    tag = "Webhook"
)]
pub async fn receive_provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.webhook_service.handle(&body, signature).await {
        Ok(WebhookOutcome::Processed(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(WebhookOutcome::Ignored(reason)) => {
            (StatusCode::OK, Json(WebhookAck::ignored(reason))).into_response()
        }
        // Already logged; the provider would only redeliver into the same failure.
        Ok(WebhookOutcome::StorageFailure) => StatusCode::OK.into_response(),
        Err(IngestError::Unauthorized(_)) => {
            (StatusCode::UNAUTHORIZED, "invalid signature").into_response()
        }
        Err(IngestError::Malformed(e)) => {
            tracing::warn!(error = %e, "Malformed webhook body");
            (StatusCode::BAD_REQUEST, "malformed payload").into_response()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/provider", post(receive_provider_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    use tablecall::{
        Call, CallIntent, CallRepository, CallStatus, ExtractionProvider, OutcomeClassifier,
    };

    use crate::adapters::memory::InMemoryCallRepository;
    use crate::application::testing::{ScriptedProvider, UnwritableRepository};
    use crate::application::{ExtractionService, WebhookService};
    use crate::signature::SignatureVerifier;

    const SECRET: &str = "whsec_route";

    fn calling() -> Call {
        let mut call = Call::new("call_abc", CallIntent::MakeReservation);
        call.status = CallStatus::Calling;
        call
    }

    fn app() -> (Router, Arc<InMemoryCallRepository>) {
        let repo = Arc::new(InMemoryCallRepository::new());
        repo.insert(calling());
        (app_with(repo.clone()), repo)
    }

    fn app_with(repo_port: Arc<dyn CallRepository>) -> Router {
        let provider: Arc<dyn ExtractionProvider> =
            Arc::new(ScriptedProvider::replying(r#"{"answers": []}"#));
        let service = WebhookService::new(
            repo_port,
            SignatureVerifier::new(SECRET, Duration::from_secs(300)),
            OutcomeClassifier::default(),
            ExtractionService::new(Some(provider), Duration::from_secs(1), Duration::from_secs(120)),
        );
        let state = AppState {
            webhook_service: Arc::new(service),
        };
        router().with_state(state)
    }

    fn request(body: &str, signed: bool) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/provider")
            .header("content-type", "application/json");
        if signed {
            let header = SignatureVerifier::new(SECRET, Duration::from_secs(300))
                .sign(body.as_bytes(), Utc::now().timestamp_millis())
                .unwrap();
            builder = builder.header(SIGNATURE_HEADER, header);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_unsigned_request_is_401() {
        let (app, repo) = app();
        let body = r#"{"event":"call_started","call":{"call_id":"call_abc"}}"#;
        let response = app.oneshot(request(body, false)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(repo.writes(), 0);
    }

    #[tokio::test]
    async fn test_garbage_body_is_400() {
        let (app, _) = app();
        let response = app.oneshot(request("{{{", true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_call_is_acknowledged_as_ignored() {
        let (app, _) = app();
        let body = r#"{"event":"call_ended","call":{"call_id":"call_nobody"}}"#;
        let response = app.oneshot(request(body, true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let ack: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ack["status"], "ignored");
    }

    #[tokio::test]
    async fn test_processed_event_is_204() {
        let (app, repo) = app();
        let body = r#"{"event":"call_connected","call":{"call_id":"call_abc"}}"#;
        let response = app.oneshot(request(body, true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(repo.get("call_abc").unwrap().0.status, CallStatus::Connected);
    }

    #[tokio::test]
    async fn test_storage_failure_is_200() {
        let app = app_with(Arc::new(UnwritableRepository::seeded(calling())));
        let body = r#"{"event":"call_connected","call":{"call_id":"call_abc"}}"#;
        let response = app.oneshot(request(body, true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
