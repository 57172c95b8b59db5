//! Transport Abstraction

use crate::error::TransportError;

/// Duplex message channel to the collector.
///
/// Lifecycle events are reported through a [`crate::LinkTracker`] from the
/// transport's own execution context.
pub trait Transport: Send + Sync {
    /// Queue one binary message. Must not wait for acknowledgment and must
    /// keep submission order on the wire. Returns
    /// [`TransportError::Backpressure`] instead of buffering without bound.
    fn send_binary(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Close the connection. No reconnect is attempted.
    fn disconnect(&self);
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send_binary(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        (**self).send_binary(payload)
    }

    fn disconnect(&self) {
        (**self).disconnect()
    }
}
