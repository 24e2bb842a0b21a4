use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to the user when a conversion or copy cannot complete.
/// None of them are fatal to the server.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("AI is not ready yet")]
    NotReady,

    #[error("Please enter some code to convert")]
    EmptyInput,

    #[error("Empty AI response")]
    EmptyResponse,

    #[error("Conversion request failed: {0}")]
    RequestFailure(String),

    #[error("Copy failed: {0}")]
    CopyFailure(String),

    #[error("A conversion is already in progress")]
    Busy,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl ConvertError {
    /// Stable identifier sent to clients alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::NotReady => "not_ready",
            ConvertError::EmptyInput => "empty_input",
            ConvertError::EmptyResponse => "empty_response",
            ConvertError::RequestFailure(_) => "request_failure",
            ConvertError::CopyFailure(_) => "copy_failure",
            ConvertError::Busy => "busy",
            ConvertError::UnsupportedLanguage(_) => "unsupported_language",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ConvertError::EmptyInput | ConvertError::UnsupportedLanguage(_) => {
                StatusCode::BAD_REQUEST
            }
            ConvertError::EmptyResponse | ConvertError::RequestFailure(_) => {
                StatusCode::BAD_GATEWAY
            }
            ConvertError::CopyFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConvertError::Busy => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (self.status_code(), body).into_response()
    }
}
