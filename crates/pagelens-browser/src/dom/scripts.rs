//! JavaScript evaluated in the page.

use serde::Serialize;

use crate::error::BrowserError;

/// Walks the rendered document and returns the raw node tree.
pub const BUILD_DOM_TREE: &str = include_str!("js/build_dom_tree.js");

/// Draws index overlays for a list of boxes.
pub const HIGHLIGHT: &str = include_str!("js/highlight.js");

/// Removes overlays and highlight marker attributes.
pub const REMOVE_HIGHLIGHTS: &str = include_str!("js/remove_highlights.js");

/// Installed on every new document: listener registry and open shadow roots.
pub const INIT_SCRIPT: &str = include_str!("js/init_script.js");

/// Expression calling `function` with `arg` serialized as its only argument.
pub fn invoke<T: Serialize>(function: &str, arg: &T) -> Result<String, BrowserError> {
    let arg = serde_json::to_string(arg)
        .map_err(|e| BrowserError::Collection(format!("Script argument: {}", e)))?;
    Ok(format!("({})({})", function.trim(), arg))
}

/// Expression calling a function that takes no arguments.
pub fn invoke_bare(function: &str) -> String {
    format!("({})()", function.trim())
}
