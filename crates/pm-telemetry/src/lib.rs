//! # Telemetry for the productive-mining node
//!
//! Two concerns, both process-global:
//!
//! - **Logging**: a `tracing` subscriber with an `EnvFilter`, emitting
//!   pretty console lines or JSON.
//! - **Metrics**: Prometheus counters and gauges in a private registry,
//!   exported as text via [`gather_metrics`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pm_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     tracing::info!("node starting");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PM_LOG_LEVEL` | Log filter (falls back to `RUST_LOG`) | `info` |
//! | `PM_JSON_LOGS` | Emit JSON lines | `false` |
//! | `PM_SERVICE_NAME` | Service name | `productive-mining` |
//! | `PM_NETWORK` | Network name | `devnet` |

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{gather_metrics, register_metrics, HistogramTimer};

use thiserror::Error;

/// Errors that can occur during telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Invalid telemetry configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)?;
    register_metrics()?;
    tracing::info!(service = %config.service_name, network = %config.network, "Telemetry initialized");
    Ok(())
}

/// Create a span for a subsystem operation.
#[macro_export]
macro_rules! subsystem_span {
    ($subsystem:expr, $operation:expr) => {
        tracing::info_span!("subsystem", id = $subsystem, operation = $operation)
    };
}
