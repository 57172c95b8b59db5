//! Bus Error Types

use thiserror::Error;

/// Errors raised by a bus source
#[derive(Debug, Error)]
pub enum BusError {
    /// Interface could not be opened (fatal at startup)
    #[error("Failed to open CAN interface {interface}: {reason}")]
    Open { interface: String, reason: String },

    /// Read failed (transient)
    #[error("CAN read error: {0}")]
    Read(std::io::Error),

    /// Read ended before one complete frame
    #[error("Short CAN read: incomplete {expected}-byte frame")]
    ShortRead { expected: usize },

    /// No frame arrived within the receive timeout
    #[error("No CAN frame within receive timeout")]
    Timeout,

    /// Source has no more frames
    #[error("CAN source closed")]
    Closed,
}

impl From<std::io::Error> for BusError {
    fn from(err: std::io::Error) -> Self {
        BusError::Read(err)
    }
}
