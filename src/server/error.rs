//! Error type for the docintel web UI.

use crate::error::DocIntelError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No document loaded — upload a PDF first")]
    NoDocument,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Document has no extractable text")]
    NoTextLayer,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DocIntelError> for ApiError {
    fn from(e: DocIntelError) -> Self {
        match e {
            DocIntelError::NotAPdf { .. }
            | DocIntelError::CorruptPdf { .. }
            | DocIntelError::PasswordRequired { .. }
            | DocIntelError::WrongPassword { .. } => ApiError::InvalidRequest(e.to_string()),
            DocIntelError::NoExtractableText { .. } => ApiError::NoTextLayer,
            DocIntelError::ProviderNotConfigured { .. } => ApiError::MissingApiKey(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NoDocument => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::MissingApiKey(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NoTextLayer => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_intel_errors_map_to_sensible_statuses() {
        let e: ApiError = DocIntelError::NoExtractableText {
            path: "/tmp/x.pdf".into(),
        }
        .into();
        assert!(matches!(e, ApiError::NoTextLayer));

        let e: ApiError = DocIntelError::ProviderNotConfigured {
            provider: "claude".into(),
            hint: "set ANTHROPIC_API_KEY".into(),
        }
        .into();
        assert!(matches!(e, ApiError::MissingApiKey(_)));

        let e: ApiError = DocIntelError::NotAPdf {
            path: "/tmp/x.pdf".into(),
            magic: *b"GIF8",
        }
        .into();
        assert!(matches!(e, ApiError::InvalidRequest(_)));
    }
}
