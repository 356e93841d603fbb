use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use docr_server::config::DEFAULT_MAX_BODY_BYTES;
use docr_server::{AppState, VisionSettings};

const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB";

/// Fake chat completions provider.
#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    body: String,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
    last_auth: Arc<Mutex<Option<String>>>,
}

impl Upstream {
    fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            last_body: Arc::new(Mutex::new(None)),
            last_auth: Arc::new(Mutex::new(None)),
        }
    }

    fn answering(markdown: &str) -> Self {
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": markdown}, "finish_reason": "stop"}
            ]
        });
        Self::new(StatusCode::OK, body.to_string())
    }

    /// Answers only after `delay`.
    fn stalling(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::answering("too late")
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn chat_completions(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    upstream.calls.fetch_add(1, Ordering::SeqCst);
    *upstream.last_body.lock().unwrap() = serde_json::from_str(&body).ok();
    *upstream.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    tokio::time::sleep(upstream.delay).await;
    (upstream.status, upstream.body.clone())
}

async fn spawn_upstream(upstream: Upstream) -> SocketAddr {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(upstream);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_docr(upstream_addr: SocketAddr) -> SocketAddr {
    spawn_docr_with_timeout(upstream_addr, 5).await
}

async fn spawn_docr_with_timeout(upstream_addr: SocketAddr, timeout_secs: u64) -> SocketAddr {
    let settings = VisionSettings {
        base_url: format!("http://{}/v1", upstream_addr),
        api_key: "test-key".to_string(),
        timeout_secs,
        ..VisionSettings::default()
    };
    let state = AppState::from_settings(settings).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(docr_server::serve(
        listener,
        state,
        DEFAULT_MAX_BODY_BYTES,
        std::future::pending(),
    ));
    addr
}

async fn post_ocr(addr: SocketAddr, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr", addr))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_transcription_round_trip() {
    let markdown = "# Invoice 42\n\n| Qty | Item |\n|---|---|\n| 2 | Bolts |\n";
    let upstream = Upstream::answering(markdown);
    let docr = spawn_docr(spawn_upstream(upstream.clone()).await).await;

    let (status, body) = post_ocr(docr, json!({ "image": IMAGE })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], markdown);
    assert_eq!(upstream.calls(), 1);
    assert_eq!(
        upstream.last_auth.lock().unwrap().as_deref(),
        Some("Bearer test-key")
    );

    let sent = upstream.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(sent["model"], "llama-3.2-11b-vision-preview");
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["max_tokens"], 1024);
    let content = &sent["messages"][0]["content"];
    assert_eq!(content[0]["type"], "text");
    assert_eq!(content[1]["type"], "image_url");
    assert_eq!(content[1]["image_url"]["url"], IMAGE);
}

#[tokio::test]
async fn test_missing_image_is_400_without_upstream_call() {
    let upstream = Upstream::answering("unused");
    let docr = spawn_docr(spawn_upstream(upstream.clone()).await).await;

    for body in [json!({}), json!({ "image": null }), json!({ "image": "" })] {
        let (status, reply) = post_ocr(docr, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "No image data provided");
    }
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let upstream = Upstream::answering("unused");
    let docr = spawn_docr(spawn_upstream(upstream.clone()).await).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/ocr", docr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_upstream_failures_are_generic_500() {
    let failures = [
        Upstream::new(StatusCode::UNAUTHORIZED, r#"{"error":{"message":"Invalid API Key"}}"#),
        Upstream::new(StatusCode::INTERNAL_SERVER_ERROR, "overloaded"),
        Upstream::new(StatusCode::OK, "<html>not json</html>"),
        Upstream::new(StatusCode::OK, r#"{"choices":[]}"#),
    ];

    for upstream in failures {
        let docr = spawn_docr(spawn_upstream(upstream.clone()).await).await;
        let (status, body) = post_ocr(docr, json!({ "image": IMAGE })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Error processing image" }));
        assert_eq!(upstream.calls(), 1, "no retry on failure");
    }
}

#[tokio::test]
async fn test_unreachable_upstream_is_500() {
    // Bind then drop to get a port with nothing listening.
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let docr = spawn_docr(closed).await;

    let (status, body) = post_ocr(docr, json!({ "image": IMAGE })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error processing image");
}

#[tokio::test]
async fn test_upstream_timeout_is_500() {
    let upstream = Upstream::stalling(Duration::from_secs(3));
    let docr = spawn_docr_with_timeout(spawn_upstream(upstream.clone()).await, 1).await;

    let (status, body) = post_ocr(docr, json!({ "image": IMAGE })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Error processing image" }));
    assert_eq!(upstream.calls(), 1, "no retry after a timeout");
}

#[tokio::test]
async fn test_health() {
    let docr = spawn_docr(spawn_upstream(Upstream::answering("")).await).await;

    let response = reqwest::get(format!("http://{}/api/health", docr))
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}
