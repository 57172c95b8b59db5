//! Pipeline Control State
//!
//! Link readiness and shutdown as one small state machine, shared by the
//! capture thread, the uplink task and the transport's event context.
//! Only transport events and process shutdown write to it.

use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Notify;
use tracing::debug;

/// Lifecycle of the uplink link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    /// Transport started, no open event yet
    Connecting = 0,
    /// Transport reported open; sends allowed
    Open = 1,
    /// Transport reported a close
    Closed = 2,
    /// Transport reported an error
    Failed = 3,
    /// Process is stopping (terminal)
    ShutDown = 4,
}

impl LinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LinkState::Connecting,
            1 => LinkState::Open,
            2 => LinkState::Closed,
            3 => LinkState::Failed,
            _ => LinkState::ShutDown,
        }
    }

    /// Whether records may be sent in this state
    pub fn is_ready(&self) -> bool {
        matches!(self, LinkState::Open)
    }
}

/// Shared control state for the capture and uplink loops
#[derive(Debug)]
pub struct PipelineState {
    link: AtomicU8,
    changed: Notify,
}

impl PipelineState {
    /// Create state in `Connecting` (not ready)
    pub fn new() -> Self {
        Self {
            link: AtomicU8::new(LinkState::Connecting as u8),
            changed: Notify::new(),
        }
    }

    /// Current link state
    pub fn link_state(&self) -> LinkState {
        LinkState::from_u8(self.link.load(Ordering::Acquire))
    }

    /// Link readiness flag read by the uplink before every send
    pub fn is_ready(&self) -> bool {
        self.link_state().is_ready()
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.link_state() == LinkState::ShutDown
    }

    /// Transport open event
    pub fn link_opened(&self) -> bool {
        self.transition(LinkState::Open)
    }

    /// Transport close event
    pub fn link_closed(&self) -> bool {
        self.transition(LinkState::Closed)
    }

    /// Transport error event
    pub fn link_failed(&self) -> bool {
        self.transition(LinkState::Failed)
    }

    /// Ask both loops to stop
    pub fn request_shutdown(&self) {
        self.link.store(LinkState::ShutDown as u8, Ordering::Release);
        self.changed.notify_one();
    }

    /// Wait for the next state transition.
    ///
    /// A transition that happened since the last wait completes this
    /// immediately. Intended for a single waiter.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    /// Move to `next` unless shut down. Returns false if the state was terminal.
    fn transition(&self, next: LinkState) -> bool {
        let result = self
            .link
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == LinkState::ShutDown as u8 {
                    None
                } else {
                    Some(next as u8)
                }
            });

        match result {
            Ok(previous) => {
                debug!("Link state {:?} -> {:?}", LinkState::from_u8(previous), next);
                self.changed.notify_one();
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_initially_not_ready() {
        let state = PipelineState::new();
        assert_eq!(state.link_state(), LinkState::Connecting);
        assert!(!state.is_ready());
        assert!(!state.is_shutdown());
    }

    #[test]
    fn test_link_transitions() {
        let state = PipelineState::new();

        assert!(state.link_opened());
        assert!(state.is_ready());

        state.link_closed();
        assert!(!state.is_ready());
        assert_eq!(state.link_state(), LinkState::Closed);

        state.link_opened();
        state.link_failed();
        assert_eq!(state.link_state(), LinkState::Failed);
        assert!(!state.is_ready());
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let state = PipelineState::new();
        state.link_opened();
        state.request_shutdown();

        assert!(!state.link_opened());
        assert!(!state.link_closed());
        assert!(state.is_shutdown());
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_transition_before_wait_is_not_lost() {
        let state = PipelineState::new();
        state.link_opened();

        tokio::time::timeout(Duration::from_millis(100), state.changed())
            .await
            .expect("pending transition should wake the waiter");
    }
}
