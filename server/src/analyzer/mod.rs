//! Document transcription through a hosted vision-language model.

pub mod prompts;
pub mod types;
pub mod vision;

use tracing::{error, info, warn};

use crate::config::VisionSettings;
use crate::error::OcrError;

pub use prompts::{build_vision_request, TRANSCRIPTION_PROMPT};
pub use types::*;
pub use vision::{extract_first_choice, ChatCompletionsClient, VisionClient};

/// Transcribe one data-URL image into Markdown.
///
/// A missing or blank image fails before the vision API is contacted. Any
/// failure from the API is logged here and surfaces as
/// [`OcrError::Upstream`]; there is no retry.
pub async fn analyze_document(
    client: &dyn VisionClient,
    settings: &VisionSettings,
    image: Option<&str>,
) -> Result<String, OcrError> {
    let image = match image.map(str::trim) {
        Some(image) if !image.is_empty() => image,
        _ => {
            warn!("Rejected analysis request without image data");
            return Err(OcrError::missing_image());
        }
    };

    let request = build_vision_request(image, settings);
    info!(
        "Transcribing image ({} chars) with model '{}'",
        image.len(),
        settings.model
    );

    match client.complete(&request).await {
        Ok(markdown) => {
            info!("Transcription complete: {} chars", markdown.len());
            Ok(markdown)
        }
        Err(e) => {
            error!("Error processing image: {}", e);
            Err(match e {
                OcrError::Upstream(_) => e,
                other => OcrError::Upstream(other.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use tokio::net::TcpListener;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Logs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Logs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Logs {
        type Writer = Logs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_rejected_upstream_status_logged_once() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let settings = VisionSettings {
            base_url: format!("http://{}/v1", addr),
            api_key: "key".to_string(),
            ..VisionSettings::default()
        };
        let client = ChatCompletionsClient::new(&settings).unwrap();

        let logs = Logs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let err = analyze_document(&client, &settings, Some("data:image/png;base64,AAAA"))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Upstream(_)));

        let logged = String::from_utf8_lossy(&logs.0.lock().unwrap()).to_string();
        assert_eq!(logged.matches("Vision API returned 401").count(), 1);
        assert!(logged.contains("Error processing image"));
    }

    #[tokio::test]
    async fn test_slow_upstream_maps_to_timeout() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                "{}"
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let settings = VisionSettings {
            base_url: format!("http://{}/v1", addr),
            api_key: "key".to_string(),
            timeout_secs: 1,
            ..VisionSettings::default()
        };
        let client = ChatCompletionsClient::new(&settings).unwrap();

        let err = analyze_document(&client, &settings, Some("data:image/png;base64,AAAA"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, OcrError::Upstream(ref m) if m.contains("timeout after 1s")),
            "unexpected error: {}",
            err
        );
    }
}
