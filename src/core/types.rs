//! Canonical type definitions for the sheet domain
//!
//! Shared by the controller, the runtime and the scenario replay so that
//! observers and tests see one vocabulary.

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// Lifecycle state of a single sheet
///
/// State machine: Hidden → Visible → Closing → Hidden
///
/// A toggle while Closing either returns to Visible or restarts the close,
/// depending on configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    #[default]
    Hidden,
    Visible,
    /// Exit animation in flight; still on screen
    Closing,
}

impl PanelState {
    /// Whether the sheet is on screen
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Hidden)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Visible => "visible",
            Self::Closing => "closing",
        }
    }
}

/// How a close ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseCause {
    /// The content's exit animation reported completion
    AnimationEnd,
    /// The guard timer expired before any completion signal
    Timeout,
    /// Finalized directly through the controller
    Forced,
}

/// Notifications emitted by the controller
///
/// Sent on a broadcast channel; observers that lag simply miss events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SheetEvent {
    /// Sheet became visible and took a scroll-lock hold
    Opened { panel: NodeId },

    /// Exit animation started, completion gate armed
    CloseStarted { panel: NodeId, generation: u64 },

    /// Toggle during close brought the sheet back
    Reopened { panel: NodeId },

    /// Toggle during close re-issued the exit animation
    CloseRestarted { panel: NodeId, generation: u64 },

    /// Sheet is hidden and its hold released
    Closed { panel: NodeId, cause: CloseCause },

    /// Toggle could not be applied
    Rejected { panel: NodeId, reason: String },

    /// Root viewport scroll lock flipped
    ScrollLockChanged { locked: bool },
}

/// Observable view of one sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub panel: NodeId,
    pub state: PanelState,
    pub container_markers: Vec<String>,
    pub content_markers: Vec<String>,
    pub scroll_locked: bool,
    /// Whether a completion gate is armed
    pub gate_armed: bool,
}
