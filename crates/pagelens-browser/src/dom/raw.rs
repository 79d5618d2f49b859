//! Wire format of the collection script.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawSnapshot {
    pub viewport: RawViewport,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawViewport {
    pub width: f64,
    pub height: f64,
}

/// One node in pre-order; `parent` is the position of its parent in the list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(flatten)]
    pub kind: RawKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawKind {
    Element(RawElement),
    Text(RawText),
    /// Comments, processing instructions and the like.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Live `value`, `checked` and `selected` of form controls.
    #[serde(default)]
    pub state: HashMap<String, String>,
    #[serde(default)]
    pub xpath: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub top: bool,
    #[serde(default)]
    pub rect: Option<RawRect>,
    #[serde(default)]
    pub cursor: String,
    #[serde(default)]
    pub listeners: bool,
    #[serde(default)]
    pub shadow_root: bool,
    /// Below a shadow root, out of reach of document xpath and selectors.
    #[serde(default)]
    pub in_shadow: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RawRect {
    /// Whether the rect overlaps the viewport grown by `expansion` on every side.
    pub fn within(&self, viewport: RawViewport, expansion: f64) -> bool {
        self.x + self.width >= -expansion
            && self.x <= viewport.width + expansion
            && self.y + self.height >= -expansion
            && self.y <= viewport.height + expansion
    }
}
