//! SocketCAN Bus Source
//!
//! Raw CAN socket bound to one interface. Reads one classic frame per call,
//! with a receive timeout so the capture loop can observe shutdown between
//! frames.

use crate::error::BusError;
use crate::frame::RawFrame;
use crate::source::BusSource;
use socketcan::{CanSocket, Socket};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

/// Size of a classic kernel CAN frame
const CAN_FRAME_SIZE: usize = 16;

/// SocketCAN source (Linux)
pub struct SocketCanSource {
    socket: CanSocket,
    interface: String,
}

impl SocketCanSource {
    /// Open and bind a raw CAN socket on `interface` (e.g. "can0", "vcan0").
    ///
    /// A zero `read_timeout` blocks indefinitely.
    pub fn open(interface: &str, read_timeout: Duration) -> Result<Self, BusError> {
        let open_error = |e: io::Error| BusError::Open {
            interface: interface.to_string(),
            reason: e.to_string(),
        };

        let socket = CanSocket::open(interface).map_err(open_error)?;
        let timeout = (!read_timeout.is_zero()).then_some(read_timeout);
        socket.set_read_timeout(timeout).map_err(open_error)?;

        info!(
            "CAN socket bound: interface={}, timeout={:?}",
            interface, read_timeout
        );

        Ok(Self {
            socket,
            interface: interface.to_string(),
        })
    }

    /// Interface name this socket is bound to
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// Sort a failed socket read into the capture loop's error classes
fn classify_read_error(err: io::Error) -> BusError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
            BusError::Timeout
        }
        io::ErrorKind::UnexpectedEof => BusError::ShortRead {
            expected: CAN_FRAME_SIZE,
        },
        _ => BusError::Read(err),
    }
}

impl BusSource for SocketCanSource {
    fn read_frame(&mut self) -> Result<RawFrame, BusError> {
        // Raw kernel frame keeps the EFF/RTR/ERR flags and the wire length intact
        let frame = self.socket.read_raw_frame().map_err(classify_read_error)?;

        Ok(RawFrame {
            can_id: frame.can_id,
            len: frame.can_dlc,
            data: frame.data,
        })
    }
}

impl Drop for SocketCanSource {
    fn drop(&mut self) {
        debug!("Closing CAN socket on {}", self.interface);
    }
}
