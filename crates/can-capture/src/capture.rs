//! Capture Loop
//!
//! Blocking bus reads on a dedicated thread. Read errors never stop the
//! loop; only shutdown or a closed source does.

use crate::error::BusError;
use crate::normalizer::Normalizer;
use crate::source::BusSource;
use ring_buffer::{HandoffQueue, PushOutcome};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use telemetry_core::{PipelineState, WireRecord};
use tracing::{debug, info, trace, warn};

/// Capture loop tuning
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// First delay after a failed read
    pub backoff_initial: Duration,
    /// Upper bound for the doubling delay
    pub backoff_max: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backoff_initial: Duration::from_millis(10),
            backoff_max: Duration::from_secs(1),
        }
    }
}

/// Doubling retry delay, capped and reset after a good read
#[derive(Debug, Clone)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(config: &CaptureConfig) -> Self {
        Self {
            initial: config.backoff_initial,
            max: config.backoff_max,
            current: config.backoff_initial,
        }
    }

    /// Delay to apply now; doubles the next one up to the cap
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames successfully read
    pub frames_read: u64,
    /// Records accepted by the queue
    pub records_queued: u64,
    /// Error frames and short reads
    pub discarded: u64,
    /// Failed reads
    pub read_errors: u64,
    /// Records lost to queue overflow
    pub overflowed: u64,
}

/// Reads frames, normalizes them and pushes records to the hand-off queue
pub struct CaptureLoop<S> {
    source: S,
    normalizer: Normalizer,
    queue: Arc<HandoffQueue>,
    state: Arc<PipelineState>,
    config: CaptureConfig,
    stats: CaptureStats,
    sleep: fn(Duration),
}

impl<S: BusSource> CaptureLoop<S> {
    /// Create a capture loop over `source`
    pub fn new(source: S, queue: Arc<HandoffQueue>, state: Arc<PipelineState>) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(),
            queue,
            state,
            config: CaptureConfig::default(),
            stats: CaptureStats::default(),
            sleep: std::thread::sleep,
        }
    }

    /// Override the backoff settings
    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific clock epoch
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Run until shutdown is requested or the source closes
    pub fn run(mut self) -> CaptureStats {
        info!("Starting CAN capture");
        let mut backoff = Backoff::new(&self.config);

        while !self.state.is_shutdown() {
            match self.source.read_frame() {
                Ok(frame) => {
                    backoff.reset();
                    self.stats.frames_read += 1;
                    metrics::counter!("canlink_frames_captured_total").increment(1);

                    match self.normalizer.normalize(&frame) {
                        Some(record) => {
                            trace!(
                                "Frame {:08X} -> source {:02X}",
                                frame.can_id,
                                record.source_id()
                            );
                            self.enqueue(record);
                        }
                        None => self.discard(),
                    }
                }
                Err(BusError::Timeout) => {}
                Err(BusError::ShortRead { expected }) => {
                    debug!("Discarding short CAN read (incomplete {}-byte frame)", expected);
                    self.discard();
                }
                Err(BusError::Closed) => {
                    info!("CAN source closed");
                    break;
                }
                Err(e) => {
                    self.stats.read_errors += 1;
                    metrics::counter!("canlink_bus_read_errors_total").increment(1);
                    let delay = backoff.next_delay();
                    warn!("CAN read failed (retry in {:?}): {}", delay, e);
                    (self.sleep)(delay);
                }
            }
        }

        info!(
            "CAN capture stopped: read={}, queued={}, discarded={}, errors={}",
            self.stats.frames_read,
            self.stats.records_queued,
            self.stats.discarded,
            self.stats.read_errors
        );
        self.stats
    }

    fn enqueue(&mut self, record: WireRecord) {
        match self.queue.push(record) {
            PushOutcome::Queued => self.stats.records_queued += 1,
            PushOutcome::DroppedOldest(_) => {
                self.stats.records_queued += 1;
                self.stats.overflowed += 1;
            }
            PushOutcome::DroppedNewest => self.stats.overflowed += 1,
        }
    }

    fn discard(&mut self) {
        self.stats.discarded += 1;
        metrics::counter!("canlink_frames_discarded_total").increment(1);
    }
}

impl<S: BusSource + Send + 'static> CaptureLoop<S> {
    /// Run the loop on a dedicated `can-capture` thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<CaptureStats>> {
        std::thread::Builder::new()
            .name("can-capture".to_string())
            .spawn(move || self.run())
    }
}
