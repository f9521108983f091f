//! `chatrelay serve` — Start the streaming gateway.

use chatrelay_config::AppConfig;
use std::path::PathBuf;
use tracing::info;

pub async fn run(
    config_path: Option<PathBuf>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(config_path.as_deref())?;

    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        model = %config.upstream.model,
        backend = %config.history.backend,
        port = config.server.port,
        "Starting chatrelay"
    );

    chatrelay_gateway::start(config).await
}
