//! Telemetry Core
//!
//! Shared building blocks of the capture-to-uplink pipeline:
//! - the fixed-size wire record sent to the collector
//! - the control state (link readiness and shutdown) shared by both loops

mod error;
mod record;
mod state;

pub use error::RecordError;
pub use record::{WireRecord, MAX_PAYLOAD, RECORD_SIZE};
pub use state::{LinkState, PipelineState};
