//! Sheet visibility control
//!
//! - **state**: transition rules (Hidden → Visible → Closing → Hidden)
//! - **regions**: backdrop/content lookup inside a sheet container
//! - **markers**: marker projection as a pure function of state
//! - **scroll_lock**: page scroll lock shared by every open sheet
//! - **gate**: one-shot completion gate with a guard timer
//! - **controller**: ties the above together per mounted sheet

pub mod controller;
pub mod gate;
pub mod markers;
pub mod regions;
pub mod scroll_lock;
pub mod state;

pub use controller::SheetController;
pub use gate::{CompletionGate, GateKey, GateTimer, ManualTimer, TimerHandle, TokioTimer};
pub use regions::Regions;
pub use scroll_lock::ScrollLock;
pub use state::{next_transition, Input, Transition};
