//! HTTP router: `POST /api/analyze` and `GET /api/health`.
//!
//! The gateway is resolved once when the state is built. If the credential or
//! instruction document is missing, the server still starts and every analyze
//! request answers 500 with the configuration message.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use underwriter_core::request_analysis;
use underwriter_gateway::{GatewayConfig, ModelGateway};
use underwriter_shared::{AnalyzeRequest, AppConfig, UnderwriterError};

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum GatewaySlot {
    Ready(ModelGateway),
    Unavailable(String),
}

/// Shared, read-only state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    gateway: Arc<GatewaySlot>,
}

impl AppState {
    /// Resolve the gateway from configuration, keeping the failure message
    /// if it cannot be built.
    pub fn from_config(config: &AppConfig) -> Self {
        let built = GatewayConfig::resolve(config).and_then(ModelGateway::new);
        match built {
            Ok(gateway) => Self::with_gateway(gateway),
            Err(e) => {
                warn!(error = %e, "model gateway unavailable; analyze requests will fail");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn with_gateway(gateway: ModelGateway) -> Self {
        Self {
            gateway: Arc::new(GatewaySlot::Ready(gateway)),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            gateway: Arc::new(GatewaySlot::Unavailable(message.into())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.gateway, GatewaySlot::Ready(_))
    }

    fn gateway(&self) -> Result<&ModelGateway, UnderwriterError> {
        match &*self.gateway {
            GatewaySlot::Ready(gateway) => Ok(gateway),
            GatewaySlot::Unavailable(message) => Err(UnderwriterError::config(message.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the API router with all routes under `/api/`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health));

    Router::new().nest("/api", api).with_state(state)
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `POST /api/analyze`: compose, call the model, return its raw answer.
///
/// An empty answer is still a 200; the caller decides what that means.
/// Configuration is checked before the body, and every failure other than an
/// upstream status is a 500.
#[instrument(skip_all, fields(request_id = %Uuid::now_v7()))]
async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let gateway = state.gateway()?;
    let Json(request) = payload?;

    info!(
        attachments = request.attachments.len(),
        "analyze request received"
    );
    let response = request_analysis(gateway, &request.form, &request.attachments).await?;

    Ok(Json(AnalyzeResponse { response }))
}

/// `GET /api/health`: liveness check.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_for(server: &MockServer) -> AppState {
        let mut app = AppConfig::default();
        app.anthropic.endpoint = format!("{}/v1/messages", server.uri());
        let config =
            GatewayConfig::from_parts(&app, "test-key".into(), "Underwrite this.".into()).unwrap();
        AppState::with_gateway(ModelGateway::new(config).unwrap())
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const PAYLOAD: &str = r#"{
        "caseNarrative": "Former partner diverted client funds.",
        "fundingRequest": "300000",
        "representationStatus": "seeking",
        "attachments": [{"name": "ledger.png", "type": "image/png", "content": "iVBORw0KGgo="}]
    }"#;

    #[tokio::test]
    async fn health_is_ok() {
        let app = router(AppState::unavailable("no key"));
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn analyze_returns_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "## Legal Theory\nStrong claim."}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = send(router(state_for(&server)), post_json(PAYLOAD)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "## Legal Theory\nStrong claim.");

        let requests = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let content = &sent["messages"][0]["content"];
        assert!(
            content[0]["text"]
                .as_str()
                .unwrap()
                .contains("LEGAL REPRESENTATION:\nSeeking Representation")
        );
        assert_eq!(content[1]["source"]["media_type"], "image/png");
    }

    #[tokio::test]
    async fn empty_model_answer_is_still_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": []})),
            )
            .mount(&server)
            .await;

        let (status, body) = send(router(state_for(&server)), post_json(PAYLOAD)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"response": ""}));
    }

    #[tokio::test]
    async fn upstream_429_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let (status, body) = send(router(state_for(&server)), post_json(PAYLOAD)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body,
            serde_json::json!({"error": "Claude API error: 429 - rate limited"})
        );
    }

    #[tokio::test]
    async fn missing_configuration_is_500() {
        let message = "ANTHROPIC_API_KEY is not set. Add it to your environment.";
        let state = AppState::unavailable(message);
        assert!(!state.is_ready());

        let (status, body) = send(router(state), post_json(PAYLOAD)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], message);
    }

    #[tokio::test]
    async fn from_config_without_key_is_unavailable() {
        let mut config = AppConfig::default();
        config.anthropic.api_key_env = "UW_API_TEST_MISSING_KEY".into();
        let state = AppState::from_config(&config);
        assert!(!state.is_ready());

        let (status, body) = send(router(state), post_json(PAYLOAD)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("UW_API_TEST_MISSING_KEY is not set")
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (status, body) = send(router(state_for(&server)), post_json("{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());

        let (status, _) = send(
            router(state_for(&server)),
            post_json(r#"{"caseNarrative": 42}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn missing_content_type_is_500() {
        let server = MockServer::start().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .body(Body::from(PAYLOAD))
            .unwrap();
        let (status, body) = send(router(state_for(&server)), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn missing_configuration_wins_over_bad_body() {
        let message = "ANTHROPIC_API_KEY is not set. Add it to your environment.";
        let app = router(AppState::unavailable(message));
        let (status, body) = send(app, post_json("{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": message}));
    }
}
