//! Vision API client.
//!
//! Speaks the OpenAI-compatible chat completions protocol, which the default
//! provider (Groq) and most hosted vision models accept.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::VisionSettings;
use crate::error::OcrError;

use super::types::{ChatRequest, ChatResponse};

/// Longest slice of an upstream error body kept in the log.
const MAX_LOGGED_BODY: usize = 1024;

/// Sends one chat completion request and returns the first choice's text.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, OcrError>;
}

pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(settings: &VisionSettings) -> Result<Self, OcrError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key: settings.api_key.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl VisionClient for ChatCompletionsClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, OcrError> {
        debug!("POST {} (model '{}')", self.endpoint, request.model);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::Upstream(format!(
                        "Vision API timeout after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    OcrError::Upstream(format!("Vision API request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OcrError::Upstream(format!("Failed to read vision API response: {}", e)))?;

        if !status.is_success() {
            return Err(OcrError::Upstream(format!(
                "Vision API returned {}: {}",
                status,
                truncate(&body, MAX_LOGGED_BODY)
            )));
        }

        extract_first_choice(&body)
    }
}

/// Pull `choices[0].message.content` out of a chat completion body.
pub fn extract_first_choice(body: &str) -> Result<String, OcrError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        OcrError::Upstream(format!(
            "Failed to parse vision API response: {}. Body: {}",
            e,
            truncate(body, 500)
        ))
    })?;

    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::Upstream("No choices in vision API response".to_string()))?
        .message
        .content
        .ok_or_else(|| OcrError::Upstream("No text content in vision API response".to_string()))
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
