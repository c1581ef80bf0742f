//! Page-wide event bus
//!
//! Platform and application code dispatch named events at a target node;
//! every subscription sees every event in dispatch order.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::dom::NodeId;

/// A named event dispatched at a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomEvent {
    pub name: String,
    pub target: NodeId,
}

impl DomEvent {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Broadcast channel carrying [`DomEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Dispatch `name` at `target`. Returns how many subscriptions saw it.
    pub fn dispatch(&self, name: &str, target: NodeId) -> usize {
        tracing::trace!(event = name, node = %target, "Dispatching event");
        self.tx.send(DomEvent::new(name, target)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
