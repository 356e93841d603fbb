//! HTTP routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use crate::analyzer::{self, ChatCompletionsClient, OcrRequest, OcrResponse, VisionClient};
use crate::config::VisionSettings;
use crate::error::OcrError;

pub const OCR_ROUTE: &str = "/api/ocr";
pub const HEALTH_ROUTE: &str = "/api/health";

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub vision: Arc<dyn VisionClient>,
    pub settings: Arc<VisionSettings>,
}

impl AppState {
    pub fn new(vision: Arc<dyn VisionClient>, settings: VisionSettings) -> Self {
        Self {
            vision,
            settings: Arc::new(settings),
        }
    }

    /// State backed by the real chat completions client.
    pub fn from_settings(settings: VisionSettings) -> Result<Self, OcrError> {
        let client = ChatCompletionsClient::new(&settings)?;
        Ok(Self::new(Arc::new(client), settings))
    }
}

/// `max_body_bytes` replaces axum's 2 MB default so full-size photos fit.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(OCR_ROUTE, post(ocr))
        .route(HEALTH_ROUTE, get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// `POST /api/ocr`: transcribe `{ image }` into `{ result }`.
pub async fn ocr(
    State(state): State<AppState>,
    payload: Result<Json<OcrRequest>, JsonRejection>,
) -> Result<Json<OcrResponse>, OcrError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected malformed analysis request: {}", rejection.body_text());
        OcrError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let result =
        analyzer::analyze_document(state.vision.as_ref(), &state.settings, request.image.as_deref())
            .await?;

    Ok(Json(OcrResponse { result }))
}
