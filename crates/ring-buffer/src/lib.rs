//! Hand-off Ring Buffer
//!
//! Bounded, order-preserving queue of wire records between the capture
//! thread (sole producer) and the uplink task (sole consumer).

mod buffer;

pub use buffer::{HandoffQueue, QueueStats, DEFAULT_CAPACITY};

use serde::{Deserialize, Serialize};
use telemetry_core::WireRecord;

/// What to do when a push finds the queue full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to make room
    #[default]
    DropOldest,
    /// Reject the incoming record
    DropNewest,
}

/// Result of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Record appended
    Queued,
    /// Record appended after evicting this one
    DroppedOldest(WireRecord),
    /// Queue full, incoming record discarded
    DroppedNewest,
}
