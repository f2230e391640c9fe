use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the feature/classifier layer.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown target column '{0}'")]
    UnknownTarget(String),
    #[error("record {index}: missing timestamp field '{field}'")]
    MissingTimestamp { index: usize, field: &'static str },
    #[error("record {index}: cannot parse timestamp '{value}'")]
    BadTimestamp { index: usize, value: String },
    #[error("shape mismatch: {0}")]
    Shape(String),
}

/// Errors surfaced by the HTTP boundary.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    Validation(String),
    #[error("malformed request body: {0}")]
    Malformed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for PredictError {
    fn from(e: ModelError) -> Self {
        PredictError::Internal(e.to_string())
    }
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::Validation(_) | PredictError::Malformed(_) => StatusCode::BAD_REQUEST,
            PredictError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let detail = match &self {
            PredictError::Validation(msg) => msg.clone(),
            PredictError::Malformed(_) => self.to_string(),
            // details stay in the server log
            PredictError::Internal(_) => "internal server error".to_string(),
        };
        (self.status(), Json(json!({ "detail": detail }))).into_response()
    }
}
