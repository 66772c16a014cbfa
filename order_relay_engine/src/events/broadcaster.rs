//! In-process publish/subscribe for order change notifications.
//!
//! Publishers never block on subscribers: each subscriber reads from a
//! bounded broadcast buffer and, once it falls more than the buffer length
//! behind, loses the oldest undelivered events rather than stalling the
//! committing transaction's thread.

use log::trace;
use tokio::sync::broadcast;

use super::ShipmentUpdateEvent;

pub const DEFAULT_BROADCAST_BUFFER: usize = 256;

#[derive(Clone)]
pub struct ShipmentBroadcaster {
    sender: broadcast::Sender<ShipmentUpdateEvent>,
}

impl Default for ShipmentBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_BUFFER)
    }
}

impl ShipmentBroadcaster {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self { sender }
    }

    /// Delivers `event` to every active subscriber. Non-blocking; an empty
    /// subscriber set is not an error.
    pub fn publish(&self, event: ShipmentUpdateEvent) {
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!("📡️ Shipment update delivered to {delivered} subscriber(s)");
    }

    /// Registers a new subscriber. The subscription ends when the receiver is
    /// dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<ShipmentUpdateEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
