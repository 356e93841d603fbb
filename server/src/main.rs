use anyhow::Context;

use docr_server::{logging, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    logging::init(&config.log_level);

    docr_server::run(config).await
}
