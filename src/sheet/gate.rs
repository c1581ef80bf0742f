//! Animation completion gate
//!
//! One gate is armed per close. It is keyed by `(panel, generation)` so a
//! timer from an earlier close can never finalize a later one. Dropping the
//! gate cancels its timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dom::{Document, NodeId};

/// Identity of one armed gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateKey {
    pub panel: NodeId,
    pub generation: u64,
}

/// Schedules the guard timeout of a gate
pub trait GateTimer: Send {
    /// Arrange for `key` to be reported as expired after `after`
    fn schedule(&self, key: GateKey, after: Duration) -> TimerHandle;
}

/// Cancels the scheduled expiry when dropped
#[derive(Debug, Default)]
pub struct TimerHandle(Option<JoinHandle<()>>);

impl TimerHandle {
    /// Handle for a timer nobody needs to cancel
    pub fn detached() -> Self {
        Self(None)
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Timer that never fires on its own; expiry is driven by the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualTimer;

impl GateTimer for ManualTimer {
    fn schedule(&self, _key: GateKey, _after: Duration) -> TimerHandle {
        TimerHandle::detached()
    }
}

/// Timer backed by a tokio task that reports expiry on a channel
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    expired: mpsc::UnboundedSender<GateKey>,
}

impl TokioTimer {
    pub fn new(expired: mpsc::UnboundedSender<GateKey>) -> Self {
        Self { expired }
    }
}

impl GateTimer for TokioTimer {
    fn schedule(&self, key: GateKey, after: Duration) -> TimerHandle {
        let expired = self.expired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = expired.send(key);
        });
        TimerHandle(Some(task))
    }
}

/// An armed completion gate for one close transition
#[derive(Debug)]
pub struct CompletionGate {
    key: GateKey,
    content: NodeId,
    _timer: TimerHandle,
}

impl CompletionGate {
    /// Arm a gate watching `content`, with an optional guard timeout
    pub fn arm(
        key: GateKey,
        content: NodeId,
        timer: &dyn GateTimer,
        timeout: Option<Duration>,
    ) -> Self {
        let handle = match timeout {
            Some(after) => timer.schedule(key, after),
            None => TimerHandle::detached(),
        };
        Self {
            key,
            content,
            _timer: handle,
        }
    }

    pub fn key(&self) -> GateKey {
        self.key
    }

    pub fn content(&self) -> NodeId {
        self.content
    }

    /// Animation-end events bubble, so anything inside the content counts
    pub fn accepts_animation_end(&self, doc: &Document, target: NodeId) -> bool {
        doc.is_within(target, self.content)
    }

    pub fn accepts_expiry(&self, key: GateKey) -> bool {
        self.key == key
    }
}
