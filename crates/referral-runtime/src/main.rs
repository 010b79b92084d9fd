//! # Referral Hub Runtime
//!
//! Loads `RH_*` configuration, starts tracing, wires the configured
//! platform and serves the HTTP gateway until Ctrl+C.

use anyhow::{Context, Result};
use tracing::{info, warn};

use referral_runtime::{init_tracing, ReferralRuntime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.telemetry).context("Failed to initialize tracing")?;

    let runtime = ReferralRuntime::new(config).context("Failed to build runtime")?;

    runtime
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl+C handler failed, shutting down");
            }
            info!("Initiating graceful shutdown...");
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
