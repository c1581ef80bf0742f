//! Core domain modules
//!
//! Error and event types shared by the controller, the runtime and the CLI.

pub mod errors;
pub mod types;

pub use errors::SheetError;
pub use types::{CloseCause, PanelSnapshot, PanelState, SheetEvent};
