//! Sheet controller
//!
//! Owns the document, one record per mounted sheet, the scroll lock and the
//! armed completion gates. Every method runs to completion synchronously; the
//! async runtime only decides when to call them.

use std::collections::HashMap;

use tokio::sync::broadcast;

use super::gate::{CompletionGate, GateKey, GateTimer, ManualTimer};
use super::markers;
use super::regions::Regions;
use super::scroll_lock::ScrollLock;
use super::state::{next_transition, Input, Transition};
use crate::config::Config;
use crate::core::{CloseCause, PanelSnapshot, PanelState, SheetError, SheetEvent};
use crate::dom::{Document, NodeId};

const EVENT_CAPACITY: usize = 256;

/// Per-sheet bookkeeping
#[derive(Debug, Default)]
struct PanelRecord {
    state: PanelState,
    gate: Option<CompletionGate>,
    /// Bumped every time a gate is armed
    generation: u64,
}

/// Visibility controller for every mounted sheet in a document
pub struct SheetController {
    doc: Document,
    config: Config,
    panels: HashMap<NodeId, PanelRecord>,
    lock: ScrollLock,
    timer: Box<dyn GateTimer>,
    events: broadcast::Sender<SheetEvent>,
}

impl SheetController {
    /// Create a controller whose gates only expire through [`Self::gate_expired`]
    pub fn new(doc: Document, config: Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            lock: ScrollLock::new(config.behavior.lock_policy),
            doc,
            config,
            panels: HashMap::new(),
            timer: Box::new(ManualTimer),
            events,
        }
    }

    /// Replace the timer used for gate guard timeouts
    ///
    /// Gates already armed are re-armed on the new timer under the same key.
    pub fn with_timer(mut self, timer: Box<dyn GateTimer>) -> Self {
        self.timer = timer;
        let timeout = self.config.behavior.close_timeout();
        for record in self.panels.values_mut() {
            if let Some(gate) = record.gate.take() {
                tracing::debug!(panel = %gate.key().panel, generation = gate.key().generation, "Re-arming gate on new timer");
                record.gate = Some(CompletionGate::arm(
                    gate.key(),
                    gate.content(),
                    self.timer.as_ref(),
                    timeout,
                ));
            }
        }
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access for building markup; markers written here are not
    /// reconciled until the next transition
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SheetEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> broadcast::Sender<SheetEvent> {
        self.events.clone()
    }

    pub fn scroll_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn is_mounted(&self, panel: NodeId) -> bool {
        self.panels.contains_key(&panel)
    }

    pub fn mounted(&self) -> Vec<NodeId> {
        let mut panels: Vec<NodeId> = self.panels.keys().copied().collect();
        panels.sort();
        panels
    }

    pub fn state(&self, panel: NodeId) -> Option<PanelState> {
        self.panels.get(&panel).map(|r| r.state)
    }

    /// Key of the gate currently armed for `panel`
    pub fn pending_gate(&self, panel: NodeId) -> Option<GateKey> {
        self.panels
            .get(&panel)
            .and_then(|r| r.gate.as_ref())
            .map(|g| g.key())
    }

    pub fn snapshot(&self, panel: NodeId) -> Option<PanelSnapshot> {
        let record = self.panels.get(&panel)?;
        let content_markers = self
            .doc
            .query_data(panel, &self.config.regions.content_attr)
            .map(|content| self.doc.classes(content))
            .unwrap_or_default();
        Some(PanelSnapshot {
            panel,
            state: record.state,
            container_markers: self.doc.classes(panel),
            content_markers,
            scroll_locked: self.lock.is_locked(),
            gate_armed: record.gate.is_some(),
        })
    }

    // ========== Lifecycle ==========

    /// Start managing `panel`
    ///
    /// The initial state is read from the container's hidden marker. A sheet
    /// mounted visible takes a scroll-lock hold right away.
    pub fn mount(&mut self, panel: NodeId) -> Result<PanelState, SheetError> {
        if !self.doc.contains(panel) {
            return Err(SheetError::UnknownNode(panel));
        }
        if self.panels.contains_key(&panel) {
            return Err(SheetError::AlreadyMounted(panel));
        }

        let state = if self.doc.has_class(panel, &self.config.markers.hidden) {
            PanelState::Hidden
        } else {
            PanelState::Visible
        };
        // incomplete markup is reported on the first toggle, not here
        if let Ok(regions) = Regions::resolve(&self.doc, panel, &self.config.regions) {
            markers::project(&mut self.doc, &regions, state, &self.config.markers);
        }
        self.panels.insert(
            panel,
            PanelRecord {
                state,
                ..PanelRecord::default()
            },
        );
        if state.is_visible() {
            self.acquire_lock(panel);
        }
        tracing::debug!(
            panel = %panel,
            tag = self.doc.tag(panel).unwrap_or("?"),
            state = state.label(),
            "Sheet mounted"
        );
        Ok(state)
    }

    /// Stop managing `panel`: disarm its gate and drop its lock hold
    ///
    /// Markers are left as they are.
    pub fn unmount(&mut self, panel: NodeId) -> Result<PanelState, SheetError> {
        let record = self
            .panels
            .remove(&panel)
            .ok_or(SheetError::NotMounted(panel))?;
        self.release_lock(panel);
        tracing::debug!(panel = %panel, state = record.state.label(), "Sheet unmounted");
        Ok(record.state)
    }

    // ========== Inputs ==========

    /// Handle a toggle request targeting `panel`
    pub fn toggle(&mut self, panel: NodeId) -> Result<PanelState, SheetError> {
        let state = self.mounted_state(panel)?;
        let regions = self.resolve(panel)?;
        tracing::debug!(
            panel = %panel,
            backdrop = ?regions.backdrop,
            content = %regions.content,
            state = state.label(),
            "Toggle received"
        );

        let transition = next_transition(state, Input::Toggle, self.config.behavior.closing_toggle);
        if state == PanelState::Closing {
            tracing::info!(
                panel = %panel,
                ?transition,
                "Toggle arrived while the exit animation is still running"
            );
        }
        Ok(self.apply(regions, transition))
    }

    /// Handle an animation-end signal fired on `target`
    ///
    /// Finalizes the closing sheet whose content contains `target`. Returns
    /// the finalized sheet, or `None` when nothing was waiting on it.
    pub fn animation_end(&mut self, target: NodeId) -> Option<NodeId> {
        let panel = self.panels.iter().find_map(|(panel, record)| {
            record
                .gate
                .as_ref()
                .filter(|gate| gate.accepts_animation_end(&self.doc, target))
                .map(|_| *panel)
        });
        let Some(panel) = panel else {
            tracing::trace!(node = %target, "animationend with no armed gate");
            return None;
        };
        self.complete(panel, Input::AnimationEnd).then_some(panel)
    }

    /// Handle expiry of a gate's guard timer
    ///
    /// Expiry of a gate that is no longer armed is ignored.
    pub fn gate_expired(&mut self, key: GateKey) -> Option<PanelState> {
        let current = self
            .panels
            .get(&key.panel)
            .and_then(|r| r.gate.as_ref())
            .is_some_and(|gate| gate.accepts_expiry(key));
        if !current {
            tracing::debug!(panel = %key.panel, generation = key.generation, "Stale gate timer ignored");
            return None;
        }
        tracing::warn!(
            panel = %key.panel,
            generation = key.generation,
            "No animation-end before the close timeout, forcing the sheet hidden"
        );
        self.complete(key.panel, Input::GateExpired);
        self.state(key.panel)
    }

    /// Hide `panel` and release its hold without waiting for any animation
    ///
    /// Idempotent: a hidden sheet is left untouched.
    pub fn finalize(&mut self, panel: NodeId) -> Result<PanelState, SheetError> {
        let state = self.mounted_state(panel)?;
        let transition = next_transition(state, Input::Finalize, self.config.behavior.closing_toggle);
        if transition == Transition::Ignore {
            return Ok(state);
        }
        let regions = self.resolve(panel)?;
        Ok(self.apply(regions, transition))
    }

    // ========== Internals ==========

    fn mounted_state(&self, panel: NodeId) -> Result<PanelState, SheetError> {
        if !self.doc.contains(panel) {
            return Err(SheetError::UnknownNode(panel));
        }
        self.state(panel).ok_or(SheetError::NotMounted(panel))
    }

    fn resolve(&self, panel: NodeId) -> Result<Regions, SheetError> {
        Regions::resolve(&self.doc, panel, &self.config.regions).inspect_err(|err| {
            tracing::warn!(panel = %panel, error = %err, "Sheet markup is incomplete, ignoring request");
            self.emit(SheetEvent::Rejected {
                panel,
                reason: err.to_string(),
            });
        })
    }

    /// Feed a completion input to a closing sheet. Returns true if it finalized.
    fn complete(&mut self, panel: NodeId, input: Input) -> bool {
        let Some(record) = self.panels.get(&panel) else {
            return false;
        };
        let transition = next_transition(record.state, input, self.config.behavior.closing_toggle);
        if transition == Transition::Ignore {
            return false;
        }
        // finish on the content the gate was armed for, even if the markup moved since
        let Some(content) = record.gate.as_ref().map(|gate| gate.content()) else {
            return false;
        };
        let regions = Regions {
            container: panel,
            backdrop: None,
            content,
        };
        self.apply(regions, transition);
        true
    }

    fn apply(&mut self, regions: Regions, transition: Transition) -> PanelState {
        let panel = regions.container;
        let Some(record) = self.panels.get_mut(&panel) else {
            return PanelState::Hidden;
        };
        let from = record.state;
        let to = transition.target(from);

        match transition {
            Transition::Open | Transition::Reopen => {
                record.gate = None;
                record.state = to;
                markers::project(&mut self.doc, &regions, to, &self.config.markers);
                let event = if transition == Transition::Open {
                    SheetEvent::Opened { panel }
                } else {
                    SheetEvent::Reopened { panel }
                };
                self.emit(event);
                self.acquire_lock(panel);
            }
            Transition::BeginClose | Transition::RestartClose => {
                record.generation += 1;
                let key = GateKey {
                    panel,
                    generation: record.generation,
                };
                // replacing the gate drops the previous one and its timer
                record.gate = Some(CompletionGate::arm(
                    key,
                    regions.content,
                    self.timer.as_ref(),
                    self.config.behavior.close_timeout(),
                ));
                record.state = to;
                markers::project(&mut self.doc, &regions, to, &self.config.markers);
                let event = if transition == Transition::BeginClose {
                    SheetEvent::CloseStarted {
                        panel,
                        generation: key.generation,
                    }
                } else {
                    SheetEvent::CloseRestarted {
                        panel,
                        generation: key.generation,
                    }
                };
                self.emit(event);
            }
            Transition::Finalize(cause) => {
                markers::project(&mut self.doc, &regions, to, &self.config.markers);
                self.settle_hidden(panel, cause);
            }
            Transition::Ignore => return from,
        }

        tracing::debug!(panel = %panel, from = from.label(), to = to.label(), "Sheet transition");
        to
    }

    fn settle_hidden(&mut self, panel: NodeId, cause: CloseCause) {
        if let Some(record) = self.panels.get_mut(&panel) {
            record.gate = None;
            record.state = PanelState::Hidden;
        }
        self.emit(SheetEvent::Closed { panel, cause });
        self.release_lock(panel);
    }

    fn acquire_lock(&mut self, panel: NodeId) {
        self.lock.acquire(panel);
        self.sync_lock_marker();
    }

    fn release_lock(&mut self, panel: NodeId) {
        self.lock.release(panel);
        self.sync_lock_marker();
    }

    fn sync_lock_marker(&mut self) {
        if self.lock.apply(&mut self.doc, &self.config.markers.scroll_locked) {
            let locked = self.lock.is_locked();
            tracing::debug!(
                locked,
                holds = self.lock.hold_count(),
                policy = ?self.lock.policy(),
                "Scroll lock changed"
            );
            self.emit(SheetEvent::ScrollLockChanged { locked });
        }
    }

    fn emit(&self, event: SheetEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClosingToggle, LockPolicy};
    use crate::dom::{SheetNodes, SheetTemplate};
    use crate::sheet::TokioTimer;

    fn sheet(doc: &mut Document, content: bool) -> SheetNodes {
        let body = doc.body();
        SheetTemplate {
            hidden_class: "hidden",
            backdrop_attr: "data-sheet-bg",
            content_attr: "data-sheet-content",
            hidden: true,
            backdrop: true,
            content,
        }
        .build(doc, body)
    }

    fn controller_with(config: Config) -> (SheetController, SheetNodes) {
        let mut doc = Document::new();
        let nodes = sheet(&mut doc, true);
        let mut controller = SheetController::new(doc, config);
        controller.mount(nodes.container).unwrap();
        (controller, nodes)
    }

    fn drain(rx: &mut broadcast::Receiver<SheetEvent>) -> Vec<SheetEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_open_emits_opened_and_locks() {
        let (mut controller, nodes) = controller_with(Config::default());
        let mut rx = controller.subscribe();

        assert_eq!(controller.toggle(nodes.container), Ok(PanelState::Visible));
        assert!(controller.scroll_locked());
        assert_eq!(
            drain(&mut rx),
            vec![
                SheetEvent::Opened {
                    panel: nodes.container
                },
                SheetEvent::ScrollLockChanged { locked: true },
            ]
        );
    }

    #[test]
    fn test_close_waits_for_animation_end() {
        let (mut controller, nodes) = controller_with(Config::default());
        let content = nodes.content.unwrap();
        controller.toggle(nodes.container).unwrap();
        assert_eq!(controller.toggle(nodes.container), Ok(PanelState::Closing));
        assert!(controller.scroll_locked());
        assert_eq!(
            controller.pending_gate(nodes.container).map(|k| k.generation),
            Some(1)
        );

        assert_eq!(controller.animation_end(content), Some(nodes.container));
        assert_eq!(controller.state(nodes.container), Some(PanelState::Hidden));
        assert!(!controller.scroll_locked());
        assert_eq!(controller.pending_gate(nodes.container), None);

        // second signal finds nothing armed
        assert_eq!(controller.animation_end(content), None);
    }

    #[test]
    fn test_enter_animation_end_is_ignored() {
        let (mut controller, nodes) = controller_with(Config::default());
        controller.toggle(nodes.container).unwrap();
        assert_eq!(controller.animation_end(nodes.content.unwrap()), None);
        assert_eq!(controller.state(nodes.container), Some(PanelState::Visible));
    }

    #[test]
    fn test_reopen_disarms_gate() {
        let (mut controller, nodes) = controller_with(Config::default());
        controller.toggle(nodes.container).unwrap();
        controller.toggle(nodes.container).unwrap();
        let key = controller.pending_gate(nodes.container).unwrap();

        assert_eq!(controller.toggle(nodes.container), Ok(PanelState::Visible));
        assert_eq!(controller.pending_gate(nodes.container), None);
        assert_eq!(controller.gate_expired(key), None);
        assert_eq!(controller.animation_end(nodes.content.unwrap()), None);
        assert_eq!(controller.state(nodes.container), Some(PanelState::Visible));
        assert!(controller.scroll_locked());
    }

    #[test]
    fn test_restart_rearms_with_new_generation() {
        let mut config = Config::default();
        config.behavior.closing_toggle = ClosingToggle::Restart;
        let (mut controller, nodes) = controller_with(config);
        controller.toggle(nodes.container).unwrap();
        controller.toggle(nodes.container).unwrap();
        let first = controller.pending_gate(nodes.container).unwrap();

        assert_eq!(controller.toggle(nodes.container), Ok(PanelState::Closing));
        let second = controller.pending_gate(nodes.container).unwrap();
        assert_eq!(second.generation, first.generation + 1);

        // the old timer can no longer finalize
        assert_eq!(controller.gate_expired(first), None);
        assert_eq!(controller.gate_expired(second), Some(PanelState::Hidden));
        assert!(!controller.scroll_locked());
    }

    #[test]
    fn test_gate_expiry_forces_close() {
        let (mut controller, nodes) = controller_with(Config::default());
        let mut rx = controller.subscribe();
        controller.toggle(nodes.container).unwrap();
        controller.toggle(nodes.container).unwrap();
        let key = controller.pending_gate(nodes.container).unwrap();

        assert_eq!(controller.gate_expired(key), Some(PanelState::Hidden));
        let events = drain(&mut rx);
        assert!(events.contains(&SheetEvent::Closed {
            panel: nodes.container,
            cause: CloseCause::Timeout
        }));
    }

    #[test]
    fn test_missing_content_rejected_without_mutation() {
        let mut doc = Document::new();
        let nodes = sheet(&mut doc, false);
        let mut controller = SheetController::new(doc, Config::default());
        controller.mount(nodes.container).unwrap();
        let mut rx = controller.subscribe();
        let before = controller.document().classes(nodes.container);

        let err = controller.toggle(nodes.container).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(controller.document().classes(nodes.container), before);
        assert!(!controller.scroll_locked());
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [SheetEvent::Rejected { .. }]
        ));
    }

    #[test]
    fn test_unmounted_and_unknown_targets() {
        let mut doc = Document::new();
        let nodes = sheet(&mut doc, true);
        let mut controller = SheetController::new(doc, Config::default());
        assert_eq!(
            controller.toggle(nodes.container),
            Err(SheetError::NotMounted(nodes.container))
        );
        controller.mount(nodes.container).unwrap();
        assert_eq!(
            controller.mount(nodes.container),
            Err(SheetError::AlreadyMounted(nodes.container))
        );
    }

    #[test]
    fn test_mount_visible_sheet_takes_lock() {
        let mut doc = Document::new();
        let nodes = sheet(&mut doc, true);
        doc.remove_class(nodes.container, "hidden");
        let mut controller = SheetController::new(doc, Config::default());

        assert_eq!(controller.mount(nodes.container), Ok(PanelState::Visible));
        assert!(controller.scroll_locked());
        assert_eq!(controller.unmount(nodes.container), Ok(PanelState::Visible));
        assert!(!controller.scroll_locked());
    }

    #[test]
    fn test_mount_projects_markers_from_state() {
        let mut doc = Document::new();
        let nodes = sheet(&mut doc, true);
        let content = nodes.content.unwrap();
        // container shown but content still carries the hidden marker
        doc.remove_class(nodes.container, "hidden");
        let mut controller = SheetController::new(doc, Config::default());

        assert_eq!(controller.mount(nodes.container), Ok(PanelState::Visible));
        let doc = controller.document();
        assert!(!doc.has_class(content, "hidden"));
        assert!(doc.has_class(content, "animate-slide-in-right"));
        assert!(!doc.has_class(nodes.container, "hidden"));
    }

    #[test]
    fn test_mount_without_content_leaves_markup_alone() {
        let mut doc = Document::new();
        let nodes = sheet(&mut doc, false);
        let mut controller = SheetController::new(doc, Config::default());
        let before = controller.document().classes(nodes.container);

        assert_eq!(controller.mount(nodes.container), Ok(PanelState::Hidden));
        assert_eq!(controller.document().classes(nodes.container), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timer_rearms_pending_gates() {
        let (mut controller, nodes) = controller_with(Config::default());
        controller.toggle(nodes.container).unwrap();
        controller.toggle(nodes.container).unwrap();
        let key = controller.pending_gate(nodes.container).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut controller = controller.with_timer(Box::new(TokioTimer::new(tx)));
        assert_eq!(controller.pending_gate(nodes.container), Some(key));

        let expired = rx.recv().await.unwrap();
        assert_eq!(expired, key);
        assert_eq!(controller.gate_expired(expired), Some(PanelState::Hidden));
        assert!(!controller.scroll_locked());
    }

    #[test]
    fn test_unmount_mid_close_releases_lock() {
        let (mut controller, nodes) = controller_with(Config::default());
        controller.toggle(nodes.container).unwrap();
        controller.toggle(nodes.container).unwrap();
        assert_eq!(controller.unmount(nodes.container), Ok(PanelState::Closing));
        assert!(!controller.scroll_locked());
        assert_eq!(controller.animation_end(nodes.content.unwrap()), None);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let (mut controller, nodes) = controller_with(Config::default());
        controller.toggle(nodes.container).unwrap();
        assert_eq!(controller.finalize(nodes.container), Ok(PanelState::Hidden));
        let snapshot = controller.snapshot(nodes.container).unwrap();

        let mut rx = controller.subscribe();
        assert_eq!(controller.finalize(nodes.container), Ok(PanelState::Hidden));
        assert_eq!(controller.snapshot(nodes.container).unwrap(), snapshot);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_content_removed_mid_close_still_releases() {
        let mut doc = Document::new();
        let body = doc.body();
        let container = doc.create_element(body, "div");
        doc.add_class(container, "hidden");
        let content = doc.create_element(container, "section");
        doc.set_data(content, "data-sheet-content");
        let mut controller = SheetController::new(doc, Config::default());
        controller.mount(container).unwrap();
        controller.toggle(container).unwrap();
        controller.toggle(container).unwrap();
        let key = controller.pending_gate(container).unwrap();

        // markup swapped out from under the sheet: region lookup now fails
        let mut config = controller.config.clone();
        config.regions.content_attr = "data-gone".to_string();
        controller.config = config;

        let mut rx = controller.subscribe();
        assert_eq!(controller.gate_expired(key), Some(PanelState::Hidden));
        assert!(controller.document().has_class(container, "hidden"));
        assert!(controller.document().has_class(content, "hidden"));
        assert!(!controller.document().has_class(content, "animate-slide-out-right"));
        assert!(!controller.scroll_locked());
        assert_eq!(
            drain(&mut rx),
            vec![
                SheetEvent::Closed {
                    panel: container,
                    cause: CloseCause::Timeout
                },
                SheetEvent::ScrollLockChanged { locked: false },
            ]
        );
    }

    #[test]
    fn test_single_flag_policy_releases_early() {
        let mut config = Config::default();
        config.behavior.lock_policy = LockPolicy::SingleFlag;
        let mut doc = Document::new();
        let a = sheet(&mut doc, true);
        let b = sheet(&mut doc, true);
        let mut controller = SheetController::new(doc, config);
        controller.mount(a.container).unwrap();
        controller.mount(b.container).unwrap();

        controller.toggle(a.container).unwrap();
        controller.toggle(b.container).unwrap();
        controller.toggle(a.container).unwrap();
        controller.animation_end(a.content.unwrap());

        assert_eq!(controller.state(b.container), Some(PanelState::Visible));
        assert!(!controller.scroll_locked());
    }
}
