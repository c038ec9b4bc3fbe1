//! Client for a remote Underwriter `/api/analyze` endpoint.

use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use url::Url;

use underwriter_shared::{AnalysisReport, AnalyzeRequest, Result, UnderwriterError};

use crate::pipeline::{AnalysisProgress, build_report};

/// User-Agent string for remote analyze requests.
const USER_AGENT: &str = concat!("Underwriter/", env!("CARGO_PKG_VERSION"));

/// Keys checked, in order, for the answer text in a success body.
const ANSWER_KEYS: &[&str] = &["response", "analysis", "content", "message", "text"];

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Posts analyze payloads to another Underwriter server.
#[derive(Debug, Clone)]
pub struct AnalyzeClient {
    client: Client,
    endpoint: Url,
}

impl AnalyzeClient {
    /// Build a client for the server rooted at `server`.
    pub fn new(server: &Url) -> Result<Self> {
        let endpoint = server
            .join("/api/analyze")
            .map_err(|e| UnderwriterError::config(format!("invalid server URL '{server}': {e}")))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UnderwriterError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one payload and return the answer text.
    ///
    /// A non-success status becomes [`UnderwriterError::Remote`] carrying the
    /// server's `error` message (or `Error <status>`); a success body without
    /// any answer text is [`UnderwriterError::EmptyResult`].
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn request_analysis(&self, request: &AnalyzeRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| UnderwriterError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            UnderwriterError::Network(format!("{}: failed to read body: {e}", self.endpoint))
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Error {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "remote analyze failed");
            return Err(UnderwriterError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| UnderwriterError::parse(format!("invalid analyze response: {e}")))?;
        extract_answer(&value).ok_or(UnderwriterError::EmptyResult)
    }

    /// Send one payload and segment the answer into a report.
    pub async fn analyze(
        &self,
        request: &AnalyzeRequest,
        progress: &dyn AnalysisProgress,
    ) -> Result<AnalysisReport> {
        request.form.validate()?;

        progress.phase("Analyzing case");
        let start = Instant::now();
        let answer = self.request_analysis(request).await?;

        progress.phase("Segmenting response");
        let report = build_report(
            answer,
            self.endpoint.as_str(),
            request.attachments.len(),
            start.elapsed(),
        )?;
        info!(sections = report.sections.len(), "remote analysis complete");

        progress.done(&report);
        Ok(report)
    }
}

/// First non-empty string among the known answer keys.
fn extract_answer(value: &serde_json::Value) -> Option<String> {
    ANSWER_KEYS
        .iter()
        .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
