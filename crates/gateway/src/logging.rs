//! Logging and metrics setup

use crate::settings::LogSettings;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<()> {
    let (level, unknown) = match Level::from_str(&settings.level) {
        Ok(level) => (level, false),
        Err(_) => (Level::INFO, true),
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to set tracing subscriber")?;

    if unknown {
        warn!("Unknown log level {:?}, using info", settings.level);
    }
    Ok(())
}

/// Serve Prometheus metrics on `addr`. Must run inside the Tokio runtime.
pub fn install_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
