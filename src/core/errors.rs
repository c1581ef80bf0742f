//! Domain error types
//!
//! These errors represent sheet lifecycle failures, distinct from infrastructure errors.
//! Each one aborts only the invocation that produced it.

use thiserror::Error;

use crate::dom::NodeId;

/// Errors raised by the sheet controller and its runtime
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SheetError {
    /// The panel has no content region, so no animation can be tracked
    #[error("Sheet {panel} has no [{attr}] content region")]
    MissingContent { panel: NodeId, attr: String },

    /// The node is not part of the document
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Toggle or finalize against a panel nobody mounted
    #[error("Sheet {0} is not mounted")]
    NotMounted(NodeId),

    #[error("Sheet {0} is already mounted")]
    AlreadyMounted(NodeId),

    /// The runtime loop has stopped
    #[error("Sheet runtime is no longer running")]
    RuntimeClosed,
}

impl SheetError {
    /// Configuration errors come from the markup, not from the caller
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingContent { .. })
    }
}
