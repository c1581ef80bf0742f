//! DOM-like document model
//!
//! A small node arena that stands in for the page: elements with class-like
//! markers, data attributes and children. The sheet controller only ever
//! touches markers on nodes that already exist here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a node within a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: BTreeSet<String>,
    data: BTreeSet<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            classes: BTreeSet::new(),
            data: BTreeSet::new(),
            parent,
            children: Vec::new(),
        }
    }
}

/// Node arena rooted at a `body` viewport node
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root viewport
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("body", None)],
            body: NodeId(0),
        }
    }

    /// The root viewport node
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Append a new element under `parent`
    ///
    /// Unknown parents fall back to the body so the arena never holds orphans.
    pub fn create_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let parent = if self.contains(parent) {
            parent
        } else {
            self.body
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(tag, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    // ========== Markers ==========

    /// Add a class-like marker. Returns true if the node changed.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => node.classes.insert(class.to_string()),
            None => false,
        }
    }

    /// Remove a class-like marker. Returns true if the node changed.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => node.classes.remove(class),
            None => false,
        }
    }

    /// Set or clear a marker in one call
    pub fn set_class(&mut self, id: NodeId, class: &str, present: bool) -> bool {
        if present {
            self.add_class(id, class)
        } else {
            self.remove_class(id, class)
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes
            .get(id.0)
            .map(|n| n.classes.contains(class))
            .unwrap_or(false)
    }

    /// Markers currently on a node, sorted
    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.nodes
            .get(id.0)
            .map(|n| n.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ========== Data attributes ==========

    pub fn set_data(&mut self, id: NodeId, attr: &str) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.data.insert(attr.to_string());
        }
    }

    pub fn has_data(&self, id: NodeId, attr: &str) -> bool {
        self.nodes
            .get(id.0)
            .map(|n| n.data.contains(attr))
            .unwrap_or(false)
    }

    /// First descendant of `root` (document order, root excluded) carrying `attr`
    pub fn query_data(&self, root: NodeId, attr: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.has_data(id, attr) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        None
    }

    /// Whether `node` is `ancestor` itself or lies below it
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

/// Node ids of a sheet built by [`SheetTemplate::build`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetNodes {
    pub container: NodeId,
    pub backdrop: Option<NodeId>,
    pub content: Option<NodeId>,
}

/// Shape of a sheet element tree: a container with an optional backdrop and
/// an optional content region
#[derive(Debug, Clone)]
pub struct SheetTemplate<'a> {
    pub hidden_class: &'a str,
    pub backdrop_attr: &'a str,
    pub content_attr: &'a str,
    pub hidden: bool,
    pub backdrop: bool,
    pub content: bool,
}

impl SheetTemplate<'_> {
    /// Append the sheet under `parent` and return its node ids
    pub fn build(&self, doc: &mut Document, parent: NodeId) -> SheetNodes {
        let container = doc.create_element(parent, "div");
        let backdrop = self.backdrop.then(|| {
            let bg = doc.create_element(container, "div");
            doc.set_data(bg, self.backdrop_attr);
            bg
        });
        let content = self.content.then(|| {
            // content sits one level down, like a panel wrapper inside the sheet
            let wrapper = doc.create_element(container, "div");
            let content = doc.create_element(wrapper, "section");
            doc.set_data(content, self.content_attr);
            content
        });
        if self.hidden {
            doc.add_class(container, self.hidden_class);
            if let Some(content) = content {
                doc.add_class(content, self.hidden_class);
            }
        }
        SheetNodes {
            container,
            backdrop,
            content,
        }
    }
}
