//! Snapshot and tracker state types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dom::{DomTree, SelectorMap};

/// One open tab, as listed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    /// Position among the session's pages.
    pub page_id: usize,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub parent_page_id: Option<usize>,
}

/// Per-step view of the current page. Never mutated once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BrowserState {
    pub element_tree: Arc<DomTree>,
    pub selector_map: SelectorMap,
    pub url: String,
    pub title: String,
    pub tabs: Vec<TabInfo>,
    /// Base64 PNG of the viewport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub pixels_above: u64,
    pub pixels_below: u64,
    pub browser_errors: Vec<String>,
}

impl BrowserState {
    /// Same snapshot with the screenshot dropped, for logging and printing.
    pub fn without_screenshot(&self) -> Self {
        Self {
            screenshot: None,
            ..self.clone()
        }
    }
}

/// Tracker state that survives re-initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextState {
    /// Remote target id of the page the agent is working in.
    #[serde(default)]
    pub target_id: Option<String>,
}
