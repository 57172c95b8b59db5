//! WebSocket Transport
//!
//! One task owns the socket. Sends are funnelled through a bounded FIFO
//! channel, so `send_binary` never waits and submission order is wire order.
//! A full channel refuses the send instead of growing; the caller keeps the
//! record. Automatic reconnection is disabled.

use crate::error::TransportError;
use crate::link::{LinkTracker, TransportEvent};
use crate::transport::Transport;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Messages buffered between the uplink and the socket task
pub const DEFAULT_SEND_BUFFER: usize = 64;

/// WebSocket client transport
pub struct WsTransport {
    outgoing: mpsc::Sender<Vec<u8>>,
    close: Arc<Notify>,
}

impl WsTransport {
    /// Start connecting to `url` on the current Tokio runtime.
    ///
    /// Returns immediately; the open/close/error outcome is reported to
    /// `tracker`. The returned handle completes when the connection ends.
    pub fn connect(url: &str, tracker: LinkTracker) -> (Self, JoinHandle<()>) {
        Self::connect_with_buffer(url, tracker, DEFAULT_SEND_BUFFER)
    }

    /// Like [`WsTransport::connect`], holding at most `buffer` unsent messages
    pub fn connect_with_buffer(
        url: &str,
        tracker: LinkTracker,
        buffer: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let close = Arc::new(Notify::new());
        let task = tokio::spawn(drive(url.to_string(), tracker, rx, close.clone()));
        (Self { outgoing: tx, close }, task)
    }
}

impl Transport for WsTransport {
    fn send_binary(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.outgoing.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Backpressure,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn disconnect(&self) {
        self.close.notify_one();
    }
}

async fn drive(
    url: String,
    tracker: LinkTracker,
    mut outgoing: mpsc::Receiver<Vec<u8>>,
    close: Arc<Notify>,
) {
    info!("Connecting to collector at {}", url);

    let ws = tokio::select! {
        connected = connect_async(url.as_str()) => match connected {
            Ok((ws, _response)) => ws,
            Err(e) => {
                tracker.handle(TransportEvent::Error(
                    TransportError::Connection(e.to_string()).to_string(),
                ));
                return;
            }
        },
        _ = close.notified() => {
            debug!("Disconnected before the collector connection opened");
            tracker.handle(TransportEvent::Closed);
            return;
        }
    };

    tracker.handle(TransportEvent::Open);
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = close.notified() => {
                debug!("Closing collector connection");
                let _ = sink.send(Message::Close(None)).await;
                tracker.handle(TransportEvent::Closed);
                break;
            }
            payload = outgoing.recv() => match payload {
                Some(payload) => {
                    if let Err(e) = sink.send(Message::Binary(payload)).await {
                        tracker.handle(TransportEvent::Error(
                            TransportError::Send(e.to_string()).to_string(),
                        ));
                        break;
                    }
                }
                None => {
                    debug!("Transport handle dropped, closing collector connection");
                    let _ = sink.send(Message::Close(None)).await;
                    tracker.handle(TransportEvent::Closed);
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => tracker.handle(TransportEvent::Message(text)),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Collector sent close: {:?}", frame);
                    tracker.handle(TransportEvent::Closed);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracker.handle(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    tracker.handle(TransportEvent::Closed);
                    break;
                }
            },
        }
    }
}
