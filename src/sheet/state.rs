//! Transition rules for a single sheet
//!
//! Pure functions over [`PanelState`]; the controller applies the result.

use crate::config::ClosingToggle;
use crate::core::{CloseCause, PanelState};

/// Inputs the state machine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Toggle,
    /// The content's exit animation finished
    AnimationEnd,
    /// Guard timer of the current gate fired
    GateExpired,
    /// Explicit finalize request
    Finalize,
}

/// What applying an input to a state should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Hidden → Visible
    Open,
    /// Visible → Closing, arm a gate
    BeginClose,
    /// Closing → Visible, disarm the gate
    Reopen,
    /// Closing → Closing with a fresh gate
    RestartClose,
    /// Closing/Visible → Hidden, release the hold
    Finalize(CloseCause),
    /// Nothing to do
    Ignore,
}

impl Transition {
    /// State after the transition is applied to `from`
    pub fn target(self, from: PanelState) -> PanelState {
        match self {
            Self::Open | Self::Reopen => PanelState::Visible,
            Self::BeginClose | Self::RestartClose => PanelState::Closing,
            Self::Finalize(_) => PanelState::Hidden,
            Self::Ignore => from,
        }
    }
}

/// Compute the transition for `input` arriving in `state`
pub fn next_transition(state: PanelState, input: Input, on_closing: ClosingToggle) -> Transition {
    match (state, input) {
        (PanelState::Hidden, Input::Toggle) => Transition::Open,
        (PanelState::Visible, Input::Toggle) => Transition::BeginClose,
        (PanelState::Closing, Input::Toggle) => match on_closing {
            ClosingToggle::Reopen => Transition::Reopen,
            ClosingToggle::Restart => Transition::RestartClose,
        },

        (PanelState::Closing, Input::AnimationEnd) => Transition::Finalize(CloseCause::AnimationEnd),
        (PanelState::Closing, Input::GateExpired) => Transition::Finalize(CloseCause::Timeout),

        // Finalize is idempotent: a hidden sheet stays as it is
        (PanelState::Visible | PanelState::Closing, Input::Finalize) => {
            Transition::Finalize(CloseCause::Forced)
        }

        // enter animations ending, stale timers, finalize on hidden
        (_, Input::AnimationEnd | Input::GateExpired | Input::Finalize) => Transition::Ignore,
    }
}
