//! Arena-backed element tree.
//!
//! Nodes live in a flat `Vec` and reference each other by [`NodeId`]. Children
//! are owned by position in the arena; the parent link is a plain index used
//! for lookups only.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

/// Index of a node inside its [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Per-snapshot index → interactive element.
pub type SelectorMap = HashMap<usize, NodeId>;

/// Element payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<NodeId>,
    /// Position from the root of the element's own document.
    pub xpath: String,
    pub is_visible: bool,
    pub is_interactive: bool,
    pub is_top_element: bool,
    pub is_in_viewport: bool,
    pub shadow_root: bool,
    /// Set by the clickable processor when a previous hash set applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_index: Option<usize>,
}

impl ElementData {
    pub fn new(tag_name: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            xpath: xpath.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether this element is a frame boundary.
    pub fn is_frame(&self) -> bool {
        matches!(self.tag_name.as_str(), "iframe" | "frame")
    }
}

/// Text payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextData {
    pub text: String,
    pub is_visible: bool,
}

/// Exactly one of element or text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Element(ElementData),
    Text(TextData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomNode {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// Element tree of one page snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomTree {
    nodes: Vec<DomNode>,
    root: Option<NodeId>,
}

impl DomTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. A node without parent becomes the root if none is set.
    ///
    /// The new node is registered among its parent's children, so the parent
    /// must be an element already in this tree.
    pub fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode { parent, kind });

        match parent {
            Some(parent) => {
                if let Some(NodeKind::Element(el)) = self.nodes.get_mut(parent.0).map(|n| &mut n.kind) {
                    el.children.push(id);
                }
            }
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children of an element; empty for text nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    /// Parent chain, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// `id` and all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// All nodes in document order, starting from the root.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DomNode)> + '_ {
        self.root
            .map(|root| self.descendants(root))
            .unwrap_or_default()
            .into_iter()
            .filter_map(move |id| self.get(id).map(|node| (id, node)))
    }

    /// Interactive elements in document order.
    pub fn interactive_elements(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| matches!(&node.kind, NodeKind::Element(el) if el.is_interactive))
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether any ancestor carries a highlight index.
    pub fn has_parent_with_highlight_index(&self, id: NodeId) -> bool {
        self.ancestors(id)
            .any(|a| self.element(a).is_some_and(|el| el.highlight_index.is_some()))
    }

    /// Visible text under `id`, stopping at nested indexed elements.
    ///
    /// `max_depth` of `None` descends without limit.
    pub fn text_until_next_clickable(&self, id: NodeId, max_depth: Option<usize>) -> String {
        let mut parts = Vec::new();
        self.collect_text(id, id, 0, max_depth, &mut parts);
        parts.join("\n").trim().to_string()
    }

    fn collect_text(
        &self,
        origin: NodeId,
        id: NodeId,
        depth: usize,
        max_depth: Option<usize>,
        parts: &mut Vec<String>,
    ) {
        if max_depth.is_some_and(|max| depth > max) {
            return;
        }

        let Some(node) = self.get(id) else {
            return;
        };

        match &node.kind {
            NodeKind::Text(text) => parts.push(text.text.clone()),
            NodeKind::Element(el) => {
                if id != origin && el.highlight_index.is_some() {
                    return;
                }
                for &child in &el.children {
                    self.collect_text(origin, child, depth + 1, max_depth, parts);
                }
            }
        }
    }

    /// Line-per-element rendering of indexed elements for the prompt layer.
    ///
    /// Only attributes named in `include_attributes` are shown. Elements flagged
    /// new since the previous snapshot are prefixed with `*`.
    pub fn clickable_elements_to_string(&self, include_attributes: &[&str]) -> String {
        let mut lines = Vec::new();

        for (id, node) in self.iter() {
            match &node.kind {
                NodeKind::Element(el) => {
                    let Some(index) = el.highlight_index else {
                        continue;
                    };

                    let text = self.text_until_next_clickable(id, None);
                    let mut attributes: Vec<&str> = Vec::new();
                    for name in include_attributes {
                        if let Some(value) = el.attribute(name) {
                            let value = value.trim();
                            if !value.is_empty()
                                && value != el.tag_name
                                && value != text
                                && !attributes.contains(&value)
                            {
                                attributes.push(value);
                            }
                        }
                    }

                    let marker = if el.is_new == Some(true) { "*" } else { "" };
                    let mut line = format!("{}[{}]<{} ", marker, index, el.tag_name);
                    line.push_str(&attributes.join(";"));
                    if !text.is_empty() {
                        if !attributes.is_empty() {
                            line.push('>');
                        }
                        line.push_str(&text);
                    }
                    line.push_str("/>");
                    lines.push(line);
                }
                NodeKind::Text(text) => {
                    if text.is_visible && !self.has_parent_with_highlight_index(id) {
                        lines.push(text.text.clone());
                    }
                }
            }
        }

        lines.join("\n")
    }
}

/// Element reference that carries the tree it was built in.
#[derive(Debug, Clone)]
pub struct ElementRef {
    tree: Arc<DomTree>,
    id: NodeId,
}

impl ElementRef {
    /// Returns `None` unless `id` names an element of `tree`.
    pub fn new(tree: Arc<DomTree>, id: NodeId) -> Option<Self> {
        tree.element(id)?;
        Some(Self { tree, id })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn data(&self) -> &ElementData {
        match self.tree.get(self.id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => el,
            _ => unreachable!("ElementRef always points at an element"),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.data().tag_name
    }

    pub fn xpath(&self) -> &str {
        &self.data().xpath
    }

    /// Ancestor elements from the root down to the direct parent.
    pub fn ancestors_from_root(&self) -> Vec<NodeId> {
        let mut chain: Vec<NodeId> = self.tree.ancestors(self.id).collect();
        chain.reverse();
        chain
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
