//! # Productive-Mining Node
//!
//! Loads configuration from `PM_*` environment variables, initializes
//! telemetry, starts the runtime and runs until Ctrl+C.

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use pm_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = NodeConfig::from_env();
    let runtime = NodeRuntime::new(config).context("Invalid node configuration")?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
