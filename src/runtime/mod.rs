//! Async runtime around the sheet controller
//!
//! ## Architecture
//!
//! - **EventBus**: broadcast channel of named events aimed at nodes
//! - **Listener**: one bus subscription per mounted sheet
//! - **SheetRuntime**: single task that owns the controller
//! - **RuntimeHandle**: cloneable front door for mount/unmount/snapshot

pub mod bus;
pub mod listener;
mod service;

pub use bus::{DomEvent, EventBus};
pub use listener::{classify, Listener, Signal};
pub use service::{RuntimeHandle, SheetRuntime};
