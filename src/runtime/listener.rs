//! Toggle signal listener
//!
//! Each mounted sheet owns exactly one bus subscription, attached on mount
//! and detached on unmount. Subscriptions are merged into a single stream so
//! the runtime loop can poll them together.

use std::pin::Pin;

use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt, StreamMap};

use super::bus::{DomEvent, EventBus};
use crate::config::EventConfig;
use crate::dom::{Document, NodeId};

type SubscriptionStream = Pin<Box<dyn Stream<Item = DomEvent> + Send>>;

/// What a bus event means for one particular sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Toggle request aimed at the sheet container
    Toggle,
    /// Animation finished somewhere inside the sheet
    AnimationEnd(NodeId),
}

/// Interpret `event` from the point of view of `panel`
///
/// Toggles only count when aimed at the container itself; animation-end
/// events bubble, so any target inside the sheet counts.
pub fn classify(
    config: &EventConfig,
    doc: &Document,
    panel: NodeId,
    event: &DomEvent,
) -> Option<Signal> {
    if config.is_toggle(&event.name) {
        return (event.target == panel).then_some(Signal::Toggle);
    }
    if event.name == config.animation_end && event.target != panel && doc.is_within(event.target, panel) {
        return Some(Signal::AnimationEnd(event.target));
    }
    None
}

fn subscription(bus: &EventBus, panel: NodeId) -> SubscriptionStream {
    let stream = BroadcastStream::new(bus.subscribe()).filter_map(move |item| match item {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(panel = %panel, skipped, "Sheet listener lagged behind the event bus");
            None
        }
    });
    Box::pin(stream)
}

/// Set of per-sheet subscriptions
pub struct Listener {
    subscriptions: StreamMap<NodeId, SubscriptionStream>,
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener {
    pub fn new() -> Self {
        Self {
            subscriptions: StreamMap::new(),
        }
    }

    /// Subscribe `panel` to the bus. Returns false if it already was.
    pub fn attach(&mut self, bus: &EventBus, panel: NodeId) -> bool {
        if self.subscriptions.contains_key(&panel) {
            return false;
        }
        self.subscriptions.insert(panel, subscription(bus, panel));
        tracing::debug!(panel = %panel, "Sheet listener attached");
        true
    }

    /// Drop `panel`'s subscription. Returns false if it had none.
    pub fn detach(&mut self, panel: NodeId) -> bool {
        let removed = self.subscriptions.remove(&panel).is_some();
        if removed {
            tracing::debug!(panel = %panel, "Sheet listener detached");
        }
        removed
    }

    pub fn is_attached(&self, panel: NodeId) -> bool {
        self.subscriptions.contains_key(&panel)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Next event together with the sheet whose subscription received it
    ///
    /// Resolves to `None` immediately when nothing is attached.
    pub async fn next(&mut self) -> Option<(NodeId, DomEvent)> {
        self.subscriptions.next().await
    }
}
