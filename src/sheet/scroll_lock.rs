//! Page scroll lock shared by every open sheet

use std::collections::BTreeSet;

use crate::config::LockPolicy;
use crate::dom::{Document, NodeId};

/// Tracks which sheets hold the scroll lock
///
/// Each sheet holds at most one hold. Under [`LockPolicy::RefCounted`] the
/// lock is set while any hold exists; under [`LockPolicy::SingleFlag`] any
/// release clears it.
#[derive(Debug, Clone)]
pub struct ScrollLock {
    policy: LockPolicy,
    holders: BTreeSet<NodeId>,
    locked: bool,
}

impl ScrollLock {
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            policy,
            holders: BTreeSet::new(),
            locked: false,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn holds(&self, panel: NodeId) -> bool {
        self.holders.contains(&panel)
    }

    pub fn hold_count(&self) -> usize {
        self.holders.len()
    }

    /// Take a hold for `panel`. Returns true if the lock flipped on.
    pub fn acquire(&mut self, panel: NodeId) -> bool {
        self.holders.insert(panel);
        let was_locked = self.locked;
        self.locked = true;
        !was_locked
    }

    /// Drop `panel`'s hold. Returns true if the lock flipped off.
    ///
    /// Releasing a sheet that holds nothing is a no-op under both policies.
    pub fn release(&mut self, panel: NodeId) -> bool {
        if !self.holders.remove(&panel) {
            return false;
        }
        let was_locked = self.locked;
        self.locked = match self.policy {
            LockPolicy::RefCounted => !self.holders.is_empty(),
            LockPolicy::SingleFlag => false,
        };
        was_locked && !self.locked
    }

    /// Mirror the lock onto the root viewport marker
    pub fn apply(&self, doc: &mut Document, marker: &str) -> bool {
        let body = doc.body();
        doc.set_class(body, marker, self.locked)
    }
}
