use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::parser::MalformedReply;
use crate::catalog::CatalogError;
use crate::extract::ExtractError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every failure serializes as `{"detail": {"message", "suggest_model_change"}}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Document contains no extractable text")]
    EmptyDocument,

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Model catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("Rate limited by the model provider")]
    RateLimited,

    #[error("Model invocation timed out")]
    InvocationTimeout,

    #[error("Malformed model response")]
    MalformedResponse { raw: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for the failure classes where switching model is more actionable
    /// than retrying the same request: rate limiting, invocation timeout, and
    /// unusable model output. Input and infrastructure errors stay false — a
    /// different model will not fix those.
    pub fn suggest_model_change(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited | AppError::InvocationTimeout | AppError::MalformedResponse { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let suggest_model_change = self.suggest_model_change();

        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UnsupportedFormat(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported file format. Only PDF or DOCX allowed.".to_string(),
            ),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::EmptyDocument => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "No extractable text found in the document".to_string(),
            ),
            AppError::ExtractionFailed(cause) => {
                // The cause can leak document internals; log it, do not echo it.
                tracing::error!("Document extraction failed: {cause}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Failed to extract text from the document".to_string(),
                )
            }
            AppError::CatalogUnavailable(cause) => {
                tracing::error!("Model catalog unavailable: {cause}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Model catalog is currently unavailable".to_string(),
                )
            }
            AppError::UpstreamTransport(cause) => {
                tracing::error!("Upstream model request failed: {cause}");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Model request failed: {cause}"),
                )
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Model provider rate limited the request".to_string(),
            ),
            AppError::InvocationTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Model request timed out".to_string(),
            ),
            AppError::MalformedResponse { raw } => {
                // Raw reply is kept for post-hoc debugging, never shown verbatim.
                tracing::warn!("Model reply was not parseable ({} bytes)", raw.len());
                tracing::debug!("Raw model reply: {raw}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM did not return valid JSON".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "detail": {
                "message": message,
                "suggest_model_change": suggest_model_change
            }
        }));

        (status, body).into_response()
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::TooLarge { size, max } => AppError::PayloadTooLarge(format!(
                "Resume document is {size} bytes; maximum allowed is {max}"
            )),
            ExtractError::Unsupported(name) => AppError::UnsupportedFormat(name),
            ExtractError::Empty => AppError::EmptyDocument,
            ExtractError::Failed(cause) => AppError::ExtractionFailed(cause),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::CatalogUnavailable(err.to_string())
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => AppError::InvocationTimeout,
            LlmError::RateLimited => AppError::RateLimited,
            LlmError::EmptyContent => AppError::MalformedResponse { raw: String::new() },
            LlmError::Http(e) => AppError::UpstreamTransport(format!("network error: {e}")),
            LlmError::Api { status, message } => {
                AppError::UpstreamTransport(format!("status {status}: {message}"))
            }
        }
    }
}

impl From<MalformedReply> for AppError {
    fn from(err: MalformedReply) -> Self {
        AppError::MalformedResponse { raw: err.raw }
    }
}
