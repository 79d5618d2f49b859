//! Builds the element tree and selector map from a live page.

use std::collections::HashMap;

use pagelens_config::ContextConfig;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::driver::PageDriver;
use crate::error::{BrowserError, DriverError};

use super::node::{DomTree, ElementData, NodeId, NodeKind, SelectorMap, TextData};
use super::raw::{RawElement, RawKind, RawSnapshot};
use super::scripts;

/// Upper bound on nodes the collection script reports.
const MAX_NODES: usize = 50_000;

/// Never rendered; dropped together with their content.
const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "meta", "link", "title", "base",
];

/// SVG geometry wrappers; dropped, their children attach to the nearest kept ancestor.
const TRANSPARENT_TAGS: &[&str] = &[
    "g", "path", "circle", "ellipse", "line", "polygon", "polyline", "rect", "defs", "use",
    "symbol", "clippath", "mask", "lineargradient", "radialgradient", "stop",
];

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "details", "summary", "option", "label",
    "video", "audio", "embed", "object", "menu", "menuitem",
];

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "checkbox", "radio", "menuitem", "menuitemcheckbox", "menuitemradio",
    "tab", "option", "switch", "treeitem", "combobox", "slider", "spinbutton", "searchbox",
    "textbox", "listbox",
];

/// Containers whose pointer cursor alone does not make them actionable.
const STRUCTURAL_TAGS: &[&str] = &[
    "html", "body", "main", "header", "footer", "nav", "section", "article", "aside", "form",
];

/// Options for one tree build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Pixels beyond the viewport still counted; `-1` disables the filter.
    pub viewport_expansion: i64,
    pub highlight_elements: bool,
    /// Only highlight this index.
    pub focus_element: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            viewport_expansion: 500,
            highlight_elements: false,
            focus_element: None,
        }
    }
}

impl BuildOptions {
    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            viewport_expansion: config.viewport_expansion,
            highlight_elements: config.highlight_elements,
            focus_element: None,
        }
    }
}

/// Result of one tree build.
#[derive(Debug, Clone, Default)]
pub struct DomState {
    pub element_tree: DomTree,
    pub selector_map: SelectorMap,
}

#[derive(Debug, Serialize)]
struct HighlightBox {
    index: usize,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Where a raw node ended up in the tree.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Kept(NodeId),
    /// Not kept; its children attach to this node.
    Transparent(Option<NodeId>),
    /// Not kept, and neither is anything below it.
    Dropped,
}

pub struct TreeBuilder;

impl TreeBuilder {
    /// Collect the page structure and index its interactive elements.
    pub async fn build(
        page: &dyn PageDriver,
        options: &BuildOptions,
    ) -> Result<DomState, BrowserError> {
        let expression = scripts::invoke(scripts::BUILD_DOM_TREE, &json!({"maxNodes": MAX_NODES}))?;
        let value = page.evaluate(&expression).await.map_err(|e| match e {
            DriverError::SessionClosed => BrowserError::from(e),
            other => BrowserError::Collection(other.to_string()),
        })?;

        let raw: RawSnapshot = serde_json::from_value(value)
            .map_err(|e| BrowserError::Collection(format!("Malformed page structure: {}", e)))?;

        let (state, boxes) = Self::from_raw(raw, options)?;
        debug!(
            "Built tree with {} nodes, {} interactive",
            state.element_tree.len(),
            state.selector_map.len()
        );

        if options.highlight_elements {
            Self::highlight(page, boxes, options.focus_element).await;
        }

        Ok(state)
    }

    /// Convert collected nodes into a tree and selector map.
    fn from_raw(
        raw: RawSnapshot,
        options: &BuildOptions,
    ) -> Result<(DomState, Vec<HighlightBox>), BrowserError> {
        if raw.truncated {
            warn!("Page structure truncated at {} nodes", MAX_NODES);
        }

        let expansion = options.viewport_expansion;
        let mut tree = DomTree::new();
        let mut selector_map = HashMap::new();
        let mut boxes = Vec::new();
        let mut slots: Vec<Slot> = Vec::with_capacity(raw.nodes.len());

        for (position, node) in raw.nodes.iter().enumerate() {
            let parent = match node.parent {
                None => None,
                Some(p) if p < position => match slots[p] {
                    Slot::Kept(id) => Some(id),
                    Slot::Transparent(target) => target,
                    Slot::Dropped => {
                        slots.push(Slot::Dropped);
                        continue;
                    }
                },
                Some(p) => {
                    return Err(BrowserError::Collection(format!(
                        "Node {} references parent {} out of order",
                        position, p
                    )));
                }
            };

            // Only the document element may stand without a parent.
            if parent.is_none() && tree.root().is_some() {
                slots.push(Slot::Dropped);
                continue;
            }

            let slot = match &node.kind {
                RawKind::Other => Slot::Dropped,
                RawKind::Text(text) => {
                    let trimmed = text.text.trim();
                    if trimmed.is_empty() || parent.is_none() {
                        Slot::Dropped
                    } else {
                        Slot::Kept(tree.push(
                            parent,
                            NodeKind::Text(TextData {
                                text: trimmed.to_string(),
                                is_visible: text.visible,
                            }),
                        ))
                    }
                }
                RawKind::Element(el) => {
                    let tag = el.tag.to_lowercase();
                    if NON_RENDERED_TAGS.contains(&tag.as_str()) {
                        Slot::Dropped
                    } else if TRANSPARENT_TAGS.contains(&tag.as_str()) {
                        Slot::Transparent(parent)
                    } else {
                        let parent_cursor = node
                            .parent
                            .and_then(|p| match &raw.nodes[p].kind {
                                RawKind::Element(parent) => Some(parent.cursor.as_str()),
                                _ => None,
                            })
                            .unwrap_or("");

                        let in_viewport = expansion < 0
                            || el
                                .rect
                                .is_some_and(|r| r.within(raw.viewport, expansion as f64));
                        // Shadow content is kept in the tree but never indexed;
                        // its xpath cannot be resolved from the document.
                        let interactive = el.visible
                            && el.top
                            && in_viewport
                            && !el.in_shadow
                            && is_interactive_candidate(&tag, el, parent_cursor);

                        let mut data = ElementData::new(tag, el.xpath.clone());
                        data.attributes = el.attributes.clone();
                        data.attributes
                            .extend(el.state.iter().map(|(k, v)| (k.clone(), v.clone())));
                        data.is_visible = el.visible;
                        data.is_top_element = el.top;
                        data.is_in_viewport = in_viewport;
                        data.is_interactive = interactive;
                        data.shadow_root = el.shadow_root;

                        if interactive {
                            let index = selector_map.len();
                            data.highlight_index = Some(index);
                            if let Some(rect) = el.rect {
                                boxes.push(HighlightBox {
                                    index,
                                    x: rect.x,
                                    y: rect.y,
                                    width: rect.width,
                                    height: rect.height,
                                });
                            }
                            let id = tree.push(parent, NodeKind::Element(data));
                            selector_map.insert(index, id);
                            Slot::Kept(id)
                        } else {
                            Slot::Kept(tree.push(parent, NodeKind::Element(data)))
                        }
                    }
                }
            };
            slots.push(slot);
        }

        Ok((
            DomState {
                element_tree: tree,
                selector_map,
            },
            boxes,
        ))
    }

    /// Draw index overlays. Failures are logged and ignored.
    async fn highlight(page: &dyn PageDriver, boxes: Vec<HighlightBox>, focus: Option<usize>) {
        let boxes: Vec<HighlightBox> = match focus {
            Some(focus) => boxes.into_iter().filter(|b| b.index == focus).collect(),
            None => boxes,
        };
        if boxes.is_empty() {
            return;
        }

        let expression = match scripts::invoke(scripts::HIGHLIGHT, &boxes) {
            Ok(expression) => expression,
            Err(e) => {
                warn!("Failed to prepare highlights: {}", e);
                return;
            }
        };
        if let Err(e) = page.evaluate(&expression).await {
            warn!("Failed to highlight elements: {}", e);
        }
    }
}

/// Tag, role, attribute and cursor heuristic for actionable elements.
fn is_interactive_candidate(tag: &str, el: &RawElement, parent_cursor: &str) -> bool {
    let attr = |name: &str| el.attributes.get(name).map(String::as_str);

    if tag == "input" && attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
        return false;
    }
    if INTERACTIVE_TAGS.contains(&tag) {
        return true;
    }
    if attr("role").is_some_and(|role| INTERACTIVE_ROLES.contains(&role.trim().to_lowercase().as_str())) {
        return true;
    }
    if el.listeners || attr("onclick").is_some() {
        return true;
    }
    if attr("tabindex").and_then(|t| t.trim().parse::<i64>().ok()).is_some_and(|t| t >= 0) {
        return true;
    }
    if attr("contenteditable").is_some_and(|v| !v.eq_ignore_ascii_case("false")) {
        return true;
    }

    // Pointer cursor inherited from an ancestor does not count.
    el.cursor == "pointer" && parent_cursor != "pointer" && !STRUCTURAL_TAGS.contains(&tag)
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
