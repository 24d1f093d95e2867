use std::sync::Arc;

use clap::Parser;

use fridge_scan::api::{start_api_server, HttpSettings};
use fridge_scan::config::{ServiceConfig, APP_NAME, APP_VERSION};
use fridge_scan::core_state::ServiceContext;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::parse();
    fridge_scan::init_tracing();

    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    // Model load and store setup do blocking I/O.
    let startup_config = config.clone();
    let core = match tokio::task::spawn_blocking(move || ServiceContext::from_config(&startup_config)).await? {
        Ok(core) => Arc::new(core),
        Err(e) => {
            tracing::error!("Startup failed: {e}");
            return Err(e.into());
        }
    };

    let settings = HttpSettings::from_config(&config);
    let server = start_api_server(core, &settings, config.bind).await?;
    tracing::info!(addr = %server.local_addr(), "Listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, shutting down");
    server.stop().await;
    Ok(())
}
