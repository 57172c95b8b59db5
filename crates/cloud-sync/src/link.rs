//! Link State Tracking
//!
//! Reflects transport lifecycle events into the shared pipeline state.

use std::sync::Arc;
use telemetry_core::PipelineState;
use tracing::{error, info, warn};

/// Event delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Open,
    /// Connection closed by either side
    Closed,
    /// Connection failed
    Error(String),
    /// Text message from the collector
    Message(String),
}

/// Writes transport events into [`PipelineState`]
#[derive(Debug, Clone)]
pub struct LinkTracker {
    state: Arc<PipelineState>,
}

impl LinkTracker {
    pub fn new(state: Arc<PipelineState>) -> Self {
        Self { state }
    }

    /// Apply one transport event
    pub fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                if self.state.link_opened() {
                    info!("Uplink connected");
                }
            }
            TransportEvent::Closed => {
                if self.state.link_closed() {
                    info!("Uplink closed");
                }
            }
            TransportEvent::Error(reason) => {
                if self.state.link_failed() {
                    error!("Uplink error: {}", reason);
                } else {
                    warn!("Uplink error during shutdown: {}", reason);
                }
            }
            TransportEvent::Message(text) => {
                info!("Collector message: {}", text);
            }
        }
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }
}
