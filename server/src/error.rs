use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::analyzer::types::ErrorBody;

/// Message returned to clients for every upstream failure.
pub const UPSTREAM_ERROR_MESSAGE: &str = "Error processing image";

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Vision API error: {0}")]
    Upstream(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl OcrError {
    pub fn missing_image() -> Self {
        OcrError::BadRequest("No image data provided".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OcrError::BadRequest(_) => StatusCode::BAD_REQUEST,
            OcrError::Upstream(_) | OcrError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client is told. Upstream details stay in the server log.
    pub fn client_message(&self) -> String {
        match self {
            OcrError::BadRequest(msg) => msg.clone(),
            OcrError::Upstream(_) => UPSTREAM_ERROR_MESSAGE.to_string(),
            OcrError::Config(_) => "Server is not configured for analysis".to_string(),
        }
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
