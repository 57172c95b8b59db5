//! CAN Link Gateway - Main Entry Point

use gateway::{config_path, init_logging, install_metrics, run, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load(&config_path())?;
    init_logging(&settings.logging)?;

    info!("=== CAN Link Gateway v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = settings.metrics.listen {
        install_metrics(addr)?;
    }

    run(settings).await
}
