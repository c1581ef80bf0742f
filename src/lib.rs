//! opsheet: overlay sheet visibility controller
//!
//! This library provides:
//! - A small element tree with marker classes and data attributes
//! - Per-sheet state machine (hidden, visible, closing) with marker projection
//! - Exit-animation completion gate with a guard timeout
//! - Reference-counted page scroll lock shared by every open sheet
//! - Async runtime that listens for toggle broadcasts on an event bus
//! - Scenario replay for scripted toggle/animation sequences

pub mod config;
pub mod core;
pub mod dom;
pub mod runtime;
pub mod scenario;
pub mod sheet;

pub use config::Config;
pub use crate::core::{CloseCause, PanelSnapshot, PanelState, SheetError, SheetEvent};
pub use dom::{Document, NodeId};
pub use runtime::{EventBus, RuntimeHandle, SheetRuntime};
pub use sheet::SheetController;
