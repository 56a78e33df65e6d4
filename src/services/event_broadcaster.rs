//! Fan-out of update events to live dashboard connections.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{WsEvent, WsEventMessage};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcasts update events to every subscribed WebSocket session.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<WsEventMessage>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WsEventMessage> {
        self.sender.subscribe()
    }

    /// Stamp and publish an event. Returns how many sessions received it;
    /// publishing with nobody listening is not an error.
    pub fn publish(&self, event: WsEvent) -> usize {
        let delivered = self.sender.send(WsEventMessage::new(event)).unwrap_or(0);
        debug!(delivered, "Published update event");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
