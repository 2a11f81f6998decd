//! Session event stream.
//!
//! Connection outcomes are asynchronous: a start request returns immediately
//! and the result arrives later from the resident worker. This module carries
//! those notifications to any number of subscribers over a tokio broadcast
//! channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use tether_types::PeerAddress;

/// Events emitted over the lifetime of a session.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// A connection attempt to the peer has begun.
    Starting { device: PeerAddress },
    /// The session is established and resident.
    Connected { device: PeerAddress },
    /// The connection attempt failed; the session returned to idle.
    ConnectFailed { device: PeerAddress, reason: String },
    /// The session ended.
    Disconnected {
        device: PeerAddress,
        reason: DisconnectReason,
    },
    /// A complete message arrived from the peer.
    Message { device: PeerAddress, text: String },
    /// The peer raised its alert flag in a message.
    Alert { device: PeerAddress, text: String },
}

/// Why a session ended.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Normal teardown requested through `stop_session`.
    UserRequested,
    /// A new selection superseded this session.
    Superseded,
    /// The link dropped without a local request.
    LinkLost,
    /// The manager is shutting down.
    Shutdown,
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher fanning session events out to subscribers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_reaches_subscriber() {
        let dispatcher = EventDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        let addr: PeerAddress = "AA:BB:CC:DD:EE:01".parse().unwrap();
        dispatcher.send(SessionEvent::Starting { device: addr });

        let event = rx.recv().await.unwrap();
        assert_eq!(event, SessionEvent::Starting { device: addr });
    }

    #[test]
    fn send_without_subscribers_is_fine() {
        let dispatcher = EventDispatcher::new(4);
        let addr: PeerAddress = "AA:BB:CC:DD:EE:01".parse().unwrap();
        dispatcher.send(SessionEvent::Connected { device: addr });
        assert_eq!(dispatcher.receiver_count(), 0);
    }

    #[test]
    fn events_serialize_with_tag() {
        let addr: PeerAddress = "AA:BB:CC:DD:EE:02".parse().unwrap();
        let json = serde_json::to_string(&SessionEvent::Disconnected {
            device: addr,
            reason: DisconnectReason::Superseded,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"disconnected\""));
        assert!(json.contains("superseded"));
    }
}
