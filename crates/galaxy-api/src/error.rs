//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Error returned by handlers; rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<galaxy_core::Error> for ApiError {
    fn from(err: galaxy_core::Error) -> Self {
        use galaxy_core::Error;

        match &err {
            Error::UnknownNoteId(_) => ApiError::NotFound(err.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            _ => {
                // Full detail goes to the log only.
                error!(error = %err, "Request failed");
                let message = match err {
                    Error::Pipeline(_) => "Layout recomputation failed",
                    Error::EmbeddingsUnavailable => "Embeddings unavailable",
                    Error::ModelUnavailable(_) | Error::Embedding(_) => {
                        "Embedding model unavailable"
                    }
                    Error::Storage(_) | Error::Io(_) => "Note store unavailable",
                    _ => "Internal server error",
                };
                ApiError::Internal(message.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
