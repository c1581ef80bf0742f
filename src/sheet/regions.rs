//! Sub-region lookup inside a sheet container

use crate::config::RegionConfig;
use crate::core::SheetError;
use crate::dom::{Document, NodeId};

/// A sheet container with its resolved sub-regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub container: NodeId,
    pub backdrop: Option<NodeId>,
    pub content: NodeId,
}

impl Regions {
    /// Find the backdrop (optional) and content (required) below `container`
    pub fn resolve(
        doc: &Document,
        container: NodeId,
        config: &RegionConfig,
    ) -> Result<Self, SheetError> {
        if !doc.contains(container) {
            return Err(SheetError::UnknownNode(container));
        }
        let backdrop = doc.query_data(container, &config.backdrop_attr);
        let content = doc.query_data(container, &config.content_attr).ok_or_else(|| {
            SheetError::MissingContent {
                panel: container,
                attr: config.content_attr.clone(),
            }
        })?;
        Ok(Self {
            container,
            backdrop,
            content,
        })
    }
}
