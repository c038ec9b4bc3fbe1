//! Model gateway: the single request/response exchange with the messages API.
//!
//! A [`ModelGateway`] is built once from a resolved [`GatewayConfig`] (API key
//! and system instruction document already loaded) and then shared. Each
//! [`ModelGateway::complete`] call sends exactly one request: no retry, no
//! backoff, no streaming.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use underwriter_shared::{
    AppConfig, ContentPart, Result, UnderwriterError, load_system_prompt, resolve_api_key,
};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("Underwriter/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Read-only settings for the gateway, resolved once at startup.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Messages endpoint.
    pub endpoint: Url,
    /// Access credential, sent as `x-api-key`.
    pub api_key: String,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Model identifier.
    pub model: String,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// System instruction document, sent verbatim.
    pub system_prompt: String,
    /// Optional request timeout; `None` leaves cancellation to the caller.
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Resolve the credential and instruction document, then build the config.
    ///
    /// Fails with a config error if either is missing.
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        let system_prompt = load_system_prompt(config)?;
        Self::from_parts(config, api_key, system_prompt)
    }

    /// Build from already-resolved secrets.
    pub fn from_parts(config: &AppConfig, api_key: String, system_prompt: String) -> Result<Self> {
        let section = &config.anthropic;
        let endpoint = Url::parse(&section.endpoint).map_err(|e| {
            UnderwriterError::config(format!("invalid endpoint '{}': {e}", section.endpoint))
        })?;

        Ok(Self {
            endpoint,
            api_key,
            api_version: section.api_version.clone(),
            model: section.model.clone(),
            max_tokens: section.max_tokens,
            system_prompt,
            timeout: (section.timeout_secs > 0).then(|| Duration::from_secs(section.timeout_secs)),
        })
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt_len", &self.system_prompt.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: Vec<WireContent<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireContent<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

impl<'a> From<&'a ContentPart> for WireContent<'a> {
    fn from(part: &'a ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text },
            ContentPart::Image {
                mime_type,
                encoded_content,
            } => Self::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: mime_type,
                    data: encoded_content,
                },
            },
        }
    }
}

/// Response envelope; only the content blocks matter here.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// Text of the first `text` block, or an empty string.
    fn first_text(self) -> String {
        self.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ModelGateway
// ---------------------------------------------------------------------------

/// Client for the external model endpoint.
#[derive(Debug, Clone)]
pub struct ModelGateway {
    client: Client,
    config: GatewayConfig,
}

impl ModelGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send the content parts and return the answer text.
    ///
    /// An empty string means the model returned no text block; callers decide
    /// whether that is a failure.
    #[instrument(skip_all, fields(model = %self.config.model, parts = parts.len()))]
    pub async fn complete(&self, parts: &[ContentPart]) -> Result<String> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &self.config.system_prompt,
            messages: [UserMessage {
                role: "user",
                content: parts.iter().map(WireContent::from).collect(),
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| UnderwriterError::Network(format!("{}: {e}", self.config.endpoint)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            UnderwriterError::Network(format!("{}: failed to read body: {e}", self.config.endpoint))
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "model endpoint returned an error");
            return Err(UnderwriterError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| UnderwriterError::parse(format!("invalid model response: {e}")))?;
        let answer = envelope.first_text();

        if answer.is_empty() {
            debug!("model response contained no text block");
        }
        let latency_ms = start.elapsed().as_millis() as u64;
        info!(
            latency_ms,
            answer_len = answer.len(),
            "model call complete"
        );

        Ok(answer)
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client(config: &GatewayConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| UnderwriterError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> GatewayConfig {
        let mut app = AppConfig::default();
        app.anthropic.endpoint = format!("{}/v1/messages", server.uri());
        GatewayConfig::from_parts(&app, "test-key".into(), "You are an underwriter.".into())
            .unwrap()
    }

    fn parts() -> Vec<ContentPart> {
        vec![
            ContentPart::Text {
                text: "=== LITIGATION FUNDING APPLICATION ===".into(),
            },
            ContentPart::Image {
                mime_type: "image/png".into(),
                encoded_content: "iVBORw0KGgo=".into(),
            },
        ]
    }

    #[test]
    fn from_parts_uses_config_defaults() {
        let app = AppConfig::default();
        let config = GatewayConfig::from_parts(&app, "k".into(), "s".into()).unwrap();
        assert_eq!(config.endpoint.as_str(), "https://api.anthropic.com/v1/messages");
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert_eq!(config.max_tokens, 16_000);
        assert!(config.timeout.is_none());
        assert!(!format!("{config:?}").contains("\"k\""));
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let mut app = AppConfig::default();
        app.anthropic.endpoint = "not a url".into();
        let err = GatewayConfig::from_parts(&app, "k".into(), "s".into()).unwrap_err();
        assert!(matches!(err, UnderwriterError::Config { .. }));
    }

    #[test]
    fn resolve_without_key_is_config_error() {
        let mut app = AppConfig::default();
        app.anthropic.api_key_env = "UW_GATEWAY_TEST_MISSING_KEY".into();
        let err = GatewayConfig::resolve(&app).unwrap_err();
        assert!(matches!(err, UnderwriterError::Config { .. }));
    }

    #[test]
    fn request_wire_format() {
        let parts = parts();
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: "sys",
            messages: [UserMessage {
                role: "user",
                content: parts.iter().map(WireContent::from).collect(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"][0]["role"], "user");
        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[1]["source"]["type"], "base64");
        assert_eq!(content[1]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["source"]["data"], "iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn complete_extracts_first_text_block() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "## Legal Theory\nStrong claim."},
                    {"type": "text", "text": "ignored"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ModelGateway::new(test_config(&server)).unwrap();
        let answer = gateway.complete(&parts()).await.unwrap();
        assert_eq!(answer, "## Legal Theory\nStrong claim.");

        let requests = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["model"], "claude-sonnet-4-5");
        assert_eq!(sent["max_tokens"], 16_000);
        assert_eq!(sent["system"], "You are an underwriter.");
        assert_eq!(sent["messages"][0]["content"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn complete_without_text_block_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"content": [{"type": "tool_use"}]})),
            )
            .mount(&server)
            .await;

        let gateway = ModelGateway::new(test_config(&server)).unwrap();
        assert_eq!(gateway.complete(&parts()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn upstream_error_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ModelGateway::new(test_config(&server)).unwrap();
        let err = gateway.complete(&parts()).await.unwrap_err();

        assert_eq!(err.to_string(), "Claude API error: 429 - rate limited");
        assert_eq!(err.http_status(), 429);
    }

    #[tokio::test]
    async fn malformed_envelope_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let gateway = ModelGateway::new(test_config(&server)).unwrap();
        let err = gateway.complete(&parts()).await.unwrap_err();
        assert!(matches!(err, UnderwriterError::Parse { .. }));
    }
}
