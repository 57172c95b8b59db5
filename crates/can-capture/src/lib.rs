//! CAN Capture
//!
//! Reads raw frames from the vehicle bus on a dedicated thread, folds each
//! one into a 14-byte wire record and hands it to the uplink queue.
//! Supports Linux SocketCAN and a simulated bus for bench testing.

mod capture;
mod error;
mod frame;
mod normalizer;
#[cfg(target_os = "linux")]
mod socket;
mod source;

pub use capture::{CaptureConfig, CaptureLoop, CaptureStats};
pub use error::BusError;
pub use frame::RawFrame;
pub use normalizer::{fold_id, normalize_at, Normalizer};
#[cfg(target_os = "linux")]
pub use socket::SocketCanSource;
pub use source::{BusSource, SimulatedBus};

/// Identifier flag and mask constants (Linux `can.h` layout)
pub mod id {
    /// Extended (29-bit) frame format
    pub const EFF_FLAG: u32 = 0x8000_0000;
    /// Remote transmission request
    pub const RTR_FLAG: u32 = 0x4000_0000;
    /// Error message frame
    pub const ERR_FLAG: u32 = 0x2000_0000;
    /// Standard identifier bits
    pub const SFF_MASK: u32 = 0x0000_07FF;
    /// Extended identifier bits
    pub const EFF_MASK: u32 = 0x1FFF_FFFF;
}
