//! Cloud Synchronization Module
//!
//! Streams wire records to the remote collector:
//! - transport abstraction with a WebSocket implementation
//! - link tracking from transport lifecycle events
//! - uplink loop gated on link readiness, one message per record

mod error;
mod link;
mod transport;
mod uplink;
mod websocket;

pub use error::TransportError;
pub use link::{LinkTracker, TransportEvent};
pub use transport::Transport;
pub use uplink::{UplinkConfig, UplinkLoop, UplinkStats};
pub use websocket::{WsTransport, DEFAULT_SEND_BUFFER};
