//! API error type with `{error}` JSON responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use underwriter_shared::UnderwriterError;

/// Error response body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be read as an analyze payload.
    #[error("{0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Underwriter(#[from] UnderwriterError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Underwriter(err) => StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "analyze request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "analyze request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidPayload(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_passes_through() {
        let err = ApiError::from(UnderwriterError::Upstream {
            status: 429,
            body: "rate limited".into(),
        });
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Claude API error: 429 - rate limited");
    }

    #[test]
    fn config_and_network_are_internal() {
        let err = ApiError::from(UnderwriterError::config("ANTHROPIC_API_KEY is not set."));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "ANTHROPIC_API_KEY is not set.");

        let err = ApiError::from(UnderwriterError::Network("connection refused".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_payload_is_500() {
        let err = ApiError::InvalidPayload("expected value at line 1".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "expected value at line 1");
    }
}
