//! Waymark console host entry point.

use std::error::Error;
use std::sync::Arc;

use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use waymark_core::clock::SystemClock;
use waymark_host::config::HostConfig;
use waymark_host::console::Console;
use waymark_host::error::HostError;
use waymark_progress_store::JsonFileGateway;
use waymark_scenes::application::catalog::load_catalog;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries the console protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Waymark console host");

    let config = HostConfig::from_env()?;
    let report = load_catalog(&config.catalog)
        .await
        .map_err(HostError::Catalog)?;
    for diagnostic in &report.diagnostics {
        tracing::warn!(%diagnostic, "catalog diagnostic");
    }

    let gateway = Arc::new(JsonFileGateway::new(&config.store_dir));
    let mut console = Console::new(gateway, Arc::new(SystemClock));
    console.load(config.namespace.clone()).await;
    console.register_scenes(report.scenes);
    tracing::info!(
        namespace = %config.namespace,
        store_dir = %config.store_dir.display(),
        "Console ready"
    );

    console
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    Ok(())
}
