//! Uplink Loop
//!
//! Drains the hand-off queue onto the transport while the link is open.
//! Waits are event driven (queue push, link transition) with a bounded idle
//! poll as a fallback. Records left in the queue at shutdown are dropped.
//! When the transport pushes back, the refused record is held and retried
//! first, so a stalled collector fills the bounded hand-off queue rather
//! than any transport buffer.

use crate::error::TransportError;
use crate::transport::Transport;
use ring_buffer::HandoffQueue;
use std::sync::Arc;
use std::time::Duration;
use telemetry_core::{PipelineState, WireRecord};
use tracing::{debug, info, warn};

/// Uplink tuning
#[derive(Debug, Clone)]
pub struct UplinkConfig {
    /// Longest wait before re-checking link and queue
    pub idle_poll: Duration,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            idle_poll: Duration::from_millis(50),
        }
    }
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UplinkStats {
    /// Records handed to the transport
    pub sent: u64,
    /// Records the transport refused
    pub send_failures: u64,
    /// Sends deferred because the transport buffer was full
    pub stalls: u64,
    /// Records still queued (or held for retry) at shutdown
    pub abandoned: u64,
}

/// Gated consumer of the hand-off queue
pub struct UplinkLoop<T> {
    queue: Arc<HandoffQueue>,
    state: Arc<PipelineState>,
    transport: T,
    config: UplinkConfig,
    stats: UplinkStats,
    held: Option<WireRecord>,
}

impl<T: Transport> UplinkLoop<T> {
    pub fn new(queue: Arc<HandoffQueue>, state: Arc<PipelineState>, transport: T) -> Self {
        Self {
            queue,
            state,
            transport,
            config: UplinkConfig::default(),
            stats: UplinkStats::default(),
            held: None,
        }
    }

    pub fn with_config(mut self, config: UplinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until shutdown is requested
    pub async fn run(mut self) -> UplinkStats {
        info!("Starting uplink");
        let mut waiting_for_link = false;

        while !self.state.is_shutdown() {
            if !self.state.is_ready() {
                if !waiting_for_link {
                    debug!("Link not ready, holding {} queued records", self.queue.len());
                    waiting_for_link = true;
                }
                self.wait_for_link().await;
                continue;
            }

            if waiting_for_link {
                debug!("Link ready, draining {} queued records", self.queue.len());
                waiting_for_link = false;
            }

            match self.held.take().or_else(|| self.queue.try_pop()) {
                Some(record) => {
                    if !self.send(record) {
                        self.wait_for_link().await;
                    }
                }
                None => self.wait_for_records().await,
            }
        }

        self.stats.abandoned = self.queue.len() as u64 + u64::from(self.held.is_some());
        info!(
            "Uplink stopped: sent={}, failed={}, abandoned={}",
            self.stats.sent, self.stats.send_failures, self.stats.abandoned
        );
        self.stats
    }

    /// Hand one record to the transport. Returns false if it was held back.
    fn send(&mut self, record: WireRecord) -> bool {
        match self.transport.send_binary(record.encode().to_vec()) {
            Ok(()) => {
                self.stats.sent += 1;
                metrics::counter!("canlink_records_sent_total").increment(1);
            }
            Err(TransportError::Backpressure) => {
                if self.stats.stalls % 1000 == 0 {
                    debug!("Transport buffer full, holding record (stalls={})", self.stats.stalls);
                }
                self.stats.stalls += 1;
                metrics::counter!("canlink_send_stalls_total").increment(1);
                self.held = Some(record);
                return false;
            }
            Err(e) => {
                self.stats.send_failures += 1;
                metrics::counter!("canlink_send_failures_total").increment(1);
                warn!("Dropping record from source {:02X}: {}", record.source_id(), e);
            }
        }
        true
    }

    async fn wait_for_link(&self) {
        let _ = tokio::time::timeout(self.config.idle_poll, self.state.changed()).await;
    }

    async fn wait_for_records(&self) {
        let _ = tokio::time::timeout(self.config.idle_poll, async {
            tokio::select! {
                _ = self.queue.notified() => {}
                _ = self.state.changed() => {}
            }
        })
        .await;
    }
}
