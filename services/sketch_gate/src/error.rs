//! Unified API error type. Every 4xx/5xx the gate produces is JSON:
//!
//! ```json
//! { "code": "provider_failed", "message": "provider: 503 ...", "request_id": "1760000000000-42" }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sketch_adapter::{GenerateError, GenerationFailure};
use sketch_normalize::NormalizeError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub request_id: Option<String>,
    pub attempts: Option<u32>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into(), request_id: None, attempts: None }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", msg)
    }

    pub fn unsupported_media_type() -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_media_type",
            "content-type must be application/json",
        )
    }

    /// Generated code had no component to bind.
    pub fn no_default_export(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "no_default_export", msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
    }

    pub fn provider_failed(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "provider_failed", msg)
    }

    /// A feature whose credentials are not set on this server.
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg)
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

impl From<GenerateError> for AppError {
    fn from(e: GenerateError) -> Self {
        match &e {
            GenerateError::Normalize(NormalizeError::NoDefaultExport) => Self::no_default_export(e.to_string()),
            GenerateError::NotConfigured(_) => Self::not_configured(e.to_string()),
            GenerateError::Normalize(NormalizeError::Incomplete { .. }) | GenerateError::Provider(_) => {
                Self::provider_failed(e.to_string())
            }
        }
    }
}

impl From<GenerationFailure> for AppError {
    fn from(f: GenerationFailure) -> Self {
        let mut err = AppError::from(f.error).with_request_id(f.request_id);
        err.attempts = Some(f.attempts);
        err
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            code: self.code,
            message: self.message,
            request_id: self.request_id,
            attempts: self.attempts,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for AppError {}
