//! Sheet runtime loop
//!
//! A single task owns the [`SheetController`] and serializes everything that
//! can touch it: bus events from the per-sheet listeners, expired gate
//! timers and commands from [`RuntimeHandle`]s. Pending bus events are always
//! drained before timers and commands.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::bus::{DomEvent, EventBus};
use super::listener::{classify, Listener, Signal};
use crate::core::{PanelSnapshot, PanelState, SheetError, SheetEvent};
use crate::dom::NodeId;
use crate::sheet::{GateKey, SheetController, TokioTimer};

/// Requests sent from a [`RuntimeHandle`] to the loop
#[derive(Debug)]
enum RuntimeCommand {
    Mount {
        panel: NodeId,
        reply: oneshot::Sender<Result<PanelState, SheetError>>,
    },
    Unmount {
        panel: NodeId,
        reply: oneshot::Sender<Result<PanelState, SheetError>>,
    },
    Snapshot {
        panel: NodeId,
        reply: oneshot::Sender<Option<PanelSnapshot>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// The event loop driving a [`SheetController`]
pub struct SheetRuntime {
    controller: SheetController,
    bus: EventBus,
    listener: Listener,
    commands: mpsc::UnboundedReceiver<RuntimeCommand>,
    expired: mpsc::UnboundedReceiver<GateKey>,
}

/// Cloneable handle for talking to a running [`SheetRuntime`]
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    commands: mpsc::UnboundedSender<RuntimeCommand>,
    bus: EventBus,
    events: broadcast::Sender<SheetEvent>,
    toggle_event: String,
    animation_end_event: String,
}

impl SheetRuntime {
    /// Wrap `controller`, attaching a listener for every sheet it already manages
    pub fn new(controller: SheetController) -> (Self, RuntimeHandle) {
        let (expired_tx, expired) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let controller = controller.with_timer(Box::new(TokioTimer::new(expired_tx)));

        let events_config = &controller.config().events;
        let bus = EventBus::new(events_config.bus_capacity);
        let handle = RuntimeHandle {
            commands: commands_tx,
            bus: bus.clone(),
            events: controller.events(),
            toggle_event: events_config.toggle.clone(),
            animation_end_event: events_config.animation_end.clone(),
        };

        let mut listener = Listener::new();
        for panel in controller.mounted() {
            listener.attach(&bus, panel);
        }

        let runtime = Self {
            controller,
            bus,
            listener,
            commands,
            expired,
        };
        (runtime, handle)
    }

    /// Build the runtime and run it on a new task
    ///
    /// The task yields the controller back once the runtime shuts down.
    pub fn spawn(controller: SheetController) -> (RuntimeHandle, JoinHandle<SheetController>) {
        let (runtime, handle) = Self::new(controller);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Run until shutdown is requested or every handle is dropped
    pub async fn run(mut self) -> SheetController {
        tracing::info!(sheets = self.listener.len(), "Sheet runtime started");

        loop {
            tokio::select! {
                biased;

                Some((panel, event)) = self.listener.next(), if !self.listener.is_empty() => {
                    self.on_event(panel, event);
                }
                Some(key) = self.expired.recv() => {
                    self.controller.gate_expired(key);
                }
                command = self.commands.recv() => match command {
                    Some(RuntimeCommand::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
            }
        }

        tracing::info!("Sheet runtime stopped");
        self.controller
    }

    fn on_event(&mut self, panel: NodeId, event: DomEvent) {
        let signal = classify(
            &self.controller.config().events,
            self.controller.document(),
            panel,
            &event,
        );
        match signal {
            Some(Signal::Toggle) => {
                // configuration errors are already logged and broadcast
                if let Err(err) = self.controller.toggle(panel) {
                    tracing::debug!(panel = %panel, error = %err, "Toggle not applied");
                }
            }
            Some(Signal::AnimationEnd(target)) => {
                self.controller.animation_end(target);
            }
            None => {}
        }
    }

    fn on_command(&mut self, command: RuntimeCommand) {
        match command {
            RuntimeCommand::Mount { panel, reply } => {
                let result = self.controller.mount(panel);
                if result.is_ok() {
                    self.listener.attach(&self.bus, panel);
                }
                let _ = reply.send(result);
            }
            RuntimeCommand::Unmount { panel, reply } => {
                self.listener.detach(panel);
                let _ = reply.send(self.controller.unmount(panel));
            }
            RuntimeCommand::Snapshot { panel, reply } => {
                let _ = reply.send(self.controller.snapshot(panel));
            }
            RuntimeCommand::Flush { reply } => {
                let _ = reply.send(());
            }
            RuntimeCommand::Shutdown => {}
        }
    }
}

impl RuntimeHandle {
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SheetEvent> {
        self.events.subscribe()
    }

    /// Dispatch the configured toggle event at `panel`
    pub fn toggle(&self, panel: NodeId) -> usize {
        self.bus.dispatch(&self.toggle_event, panel)
    }

    /// Report that an animation finished on `target`
    pub fn animation_end(&self, target: NodeId) -> usize {
        self.bus.dispatch(&self.animation_end_event, target)
    }

    pub async fn mount(&self, panel: NodeId) -> Result<PanelState, SheetError> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeCommand::Mount { panel, reply })?;
        rx.await.map_err(|_| SheetError::RuntimeClosed)?
    }

    pub async fn unmount(&self, panel: NodeId) -> Result<PanelState, SheetError> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeCommand::Unmount { panel, reply })?;
        rx.await.map_err(|_| SheetError::RuntimeClosed)?
    }

    /// Snapshot of `panel` once every event dispatched so far is processed
    pub async fn snapshot(&self, panel: NodeId) -> Result<Option<PanelSnapshot>, SheetError> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeCommand::Snapshot { panel, reply })?;
        rx.await.map_err(|_| SheetError::RuntimeClosed)
    }

    /// Wait until every event dispatched so far has been processed
    pub async fn flush(&self) -> Result<(), SheetError> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeCommand::Flush { reply })?;
        rx.await.map_err(|_| SheetError::RuntimeClosed)
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(RuntimeCommand::Shutdown);
    }

    fn send(&self, command: RuntimeCommand) -> Result<(), SheetError> {
        self.commands
            .send(command)
            .map_err(|_| SheetError::RuntimeClosed)
    }
}
