use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain_postback::TemplateError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Error body returned by the ingest API
///
/// ```json
/// { "error": "BAD_REQUEST", "message": "Unknown param {b} in endpoint URL" }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid Content-Type, expecting application/json")]
    UnsupportedContentType,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Error building postback URL: {0}")]
    Template(#[from] TemplateError),

    #[error("Error producing postback message(s) to Kafka: {0}")]
    Publish(String),
}

impl IngestError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            IngestError::UnsupportedContentType => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            IngestError::InvalidBody(_) | IngestError::Template(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            IngestError::Publish(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<JsonRejection> for IngestError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => IngestError::UnsupportedContentType,
            other => IngestError::InvalidBody(other.body_text()),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        if status.is_server_error() {
            error!(error = %self, "Postback ingest failed");
        } else {
            warn!(error = %self, "Postback request rejected");
        }

        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(IngestError::UnsupportedContentType.status().0, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(IngestError::InvalidBody("x".into()).status().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            IngestError::from(TemplateError::UnknownParameter("a".into())).status().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(IngestError::Publish("down".into()).status().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
