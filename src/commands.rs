use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Path of the analysis route on the server.
pub const OCR_ROUTE: &str = "/api/ocr";

/// Used when there is no browser location to derive the origin from.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:3000";

const FALLBACK_ERROR: &str = "Failed to analyze image";

// -- Wire types matching the server --

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Origin of the page serving the app, or [`DEFAULT_API_BASE`].
#[cfg(target_arch = "wasm32")]
pub fn api_base() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .filter(|origin| !origin.is_empty() && origin != "null")
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Send a data URL to the analysis route and return the Markdown result.
pub async fn analyze_image(image: &str) -> Result<String, ClientError> {
    analyze_image_at(&api_base(), image).await
}

pub async fn analyze_image_at(base: &str, image: &str) -> Result<String, ClientError> {
    let url = format!("{}{}", base.trim_end_matches('/'), OCR_ROUTE);
    info!("Submitting image to {}", url);

    let response = reqwest::Client::new()
        .post(&url)
        .json(&OcrRequest { image })
        .send()
        .await
        .map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            ClientError::Network(e.to_string())
        })?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Network(format!("Failed to read response body: {}", e)))?;

    interpret_response(status, &body)
}

/// Map a status and body from the analysis route to a result.
///
/// Error bodies carry `{ "error": string }`; anything else falls back to a
/// generic message.
pub fn interpret_response(status: u16, body: &str) -> Result<String, ClientError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR.to_string());
        error!("Analysis failed with status {}: {}", status, message);
        return Err(ClientError::Server { status, message });
    }

    serde_json::from_str::<OcrResponse>(body)
        .map(|r| r.result)
        .map_err(|e| ClientError::Decode(e.to_string()))
}
