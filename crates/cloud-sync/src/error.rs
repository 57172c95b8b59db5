//! Transport Error Types

use thiserror::Error;

/// Uplink transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),

    /// Send buffer full; the message was not taken
    #[error("Send buffer full")]
    Backpressure,

    #[error("Transport closed")]
    Closed,
}
