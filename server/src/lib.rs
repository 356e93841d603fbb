//! Docr analysis server.
//!
//! Exposes `POST /api/ocr`, which forwards a document image to a hosted
//! vision-language model and returns its Markdown transcription.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::{error, info};

pub use config::{ServerConfig, VisionSettings};
pub use error::OcrError;
pub use routes::{router, AppState};

/// Bind the configured address and serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::from_settings(config.vision.clone())?;

    let listener = TcpListener::bind(addr).await?;
    info!(
        "Docr server listening on {} (model '{}')",
        listener.local_addr()?,
        config.vision.model
    );

    serve(listener, state, config.max_body_bytes, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    max_body_bytes: usize,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state, max_body_bytes))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Docr server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
