//! CAN Link Gateway
//!
//! Wires the capture thread, hand-off queue and WebSocket uplink together:
//!
//! ```text
//! CAN bus -> CaptureLoop -> HandoffQueue -> UplinkLoop -> collector
//! ```

mod logging;
mod settings;

pub use logging::{init_logging, install_metrics};
pub use settings::{
    config_path, BusSettings, ConfigError, LogSettings, MetricsSettings, QueueSettings, Settings,
    UplinkSettings,
};

use anyhow::{anyhow, Context};
use can_capture::{BusError, BusSource, CaptureLoop, CaptureStats, SimulatedBus};
use cloud_sync::{LinkTracker, Transport, UplinkConfig, UplinkLoop, UplinkStats, WsTransport};
use ring_buffer::{HandoffQueue, QueueStats};
use std::sync::Arc;
use std::time::Duration;
use telemetry_core::PipelineState;
use tracing::{error, info, warn};

/// How long to wait for the WebSocket close handshake at shutdown
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Counters collected at shutdown
#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
    pub capture: CaptureStats,
    pub uplink: UplinkStats,
    pub queue: QueueStats,
}

/// Running capture thread and uplink task
pub struct Pipeline<T> {
    state: Arc<PipelineState>,
    queue: Arc<HandoffQueue>,
    transport: Arc<T>,
    capture: std::thread::JoinHandle<CaptureStats>,
    uplink: tokio::task::JoinHandle<UplinkStats>,
}

impl<T: Transport + 'static> Pipeline<T> {
    /// Start both loops. Must run inside the Tokio runtime.
    pub fn start<S: BusSource + Send + 'static>(
        source: S,
        transport: Arc<T>,
        state: Arc<PipelineState>,
        queue: Arc<HandoffQueue>,
        uplink_config: UplinkConfig,
    ) -> anyhow::Result<Self> {
        let capture = CaptureLoop::new(source, queue.clone(), state.clone())
            .spawn()
            .context("Failed to spawn capture thread")?;

        let uplink = tokio::spawn(
            UplinkLoop::new(queue.clone(), state.clone(), transport.clone())
                .with_config(uplink_config)
                .run(),
        );

        Ok(Self {
            state,
            queue,
            transport,
            capture,
            uplink,
        })
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    pub fn queue(&self) -> &Arc<HandoffQueue> {
        &self.queue
    }

    /// Stop both loops and collect their counters. Queued records are dropped.
    pub async fn shutdown(self) -> anyhow::Result<PipelineReport> {
        self.state.request_shutdown();
        self.transport.disconnect();

        let uplink = self.uplink.await.context("Uplink task failed")?;
        let capture_thread = self.capture;
        let capture = tokio::task::spawn_blocking(move || capture_thread.join())
            .await
            .context("Failed to join capture thread")?
            .map_err(|_| anyhow!("Capture thread panicked"))?;

        Ok(PipelineReport {
            capture,
            uplink,
            queue: self.queue.stats(),
        })
    }
}

/// Open the configured bus source. Failure here is fatal.
pub fn open_bus(settings: &BusSettings) -> Result<Box<dyn BusSource + Send>, BusError> {
    if settings.simulate {
        return Ok(Box::new(SimulatedBus::new(settings.simulate_interval())));
    }

    #[cfg(target_os = "linux")]
    {
        let source =
            can_capture::SocketCanSource::open(&settings.interface, settings.read_timeout())?;
        Ok(Box::new(source))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(BusError::Open {
            interface: settings.interface.clone(),
            reason: "SocketCAN requires Linux; set bus.simulate = true".to_string(),
        })
    }
}

/// Run the gateway until Ctrl-C or SIGTERM
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let source = match open_bus(&settings.bus) {
        Ok(source) => source,
        Err(e) => {
            error!("Cannot open CAN bus source: {}", e);
            return Err(e.into());
        }
    };

    let state = Arc::new(PipelineState::new());
    let queue = Arc::new(HandoffQueue::new(settings.queue.capacity, settings.queue.overflow));
    info!(
        "Hand-off queue: capacity={}, overflow={:?}",
        queue.capacity(),
        queue.policy()
    );

    let (transport, transport_task) = WsTransport::connect_with_buffer(
        &settings.uplink.url,
        LinkTracker::new(state.clone()),
        settings.uplink.send_buffer,
    );

    let uplink_config = UplinkConfig {
        idle_poll: Duration::from_millis(settings.uplink.idle_poll_ms),
    };
    let pipeline = Pipeline::start(source, Arc::new(transport), state, queue, uplink_config)?;

    shutdown_signal().await;
    info!("Shutdown requested");

    let report = pipeline.shutdown().await?;
    if tokio::time::timeout(CLOSE_GRACE, transport_task).await.is_err() {
        warn!("Collector connection did not close within {:?}", CLOSE_GRACE);
    }

    info!(
        "Gateway stopped: captured={}, sent={}, stalls={}, dropped={}, abandoned={}",
        report.capture.frames_read,
        report.uplink.sent,
        report.uplink.stalls,
        report.queue.dropped,
        report.uplink.abandoned
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
