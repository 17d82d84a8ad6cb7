//! Kodepos Server - Main entry point

use anyhow::Result;
use kodepos_common::logging::{init_logging, LogConfig};
use kodepos_server::{api, config::Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("kodepos-server".to_string())
        .filter_directives("kodepos_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Environment variables take precedence over the defaults above
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Kodepos Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await?;

    info!("Server shut down");

    Ok(())
}
