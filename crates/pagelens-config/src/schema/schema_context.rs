//! Browser context and clickable-hash configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-context behaviour of the snapshot engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Draw index overlays on interactive elements while building the tree.
    #[serde(default = "crate::schema::default_true")]
    pub highlight_elements: bool,

    /// Pixels beyond the viewport in which elements still count as present.
    /// `-1` disables the viewport filter entirely.
    #[serde(default = "default_viewport_expansion")]
    pub viewport_expansion: i64,

    /// Include test hooks such as `data-testid` in synthesized selectors.
    #[serde(default = "crate::schema::default_true")]
    pub include_dynamic_attributes: bool,

    /// Leave the browser session open when the context is closed.
    #[serde(default)]
    pub keep_alive: bool,

    /// Domains navigation and tab switches are restricted to. Unrestricted when unset.
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,

    /// Seconds to wait at least before collecting page state.
    #[serde(default = "default_minimum_wait")]
    pub minimum_wait_page_load_time: f64,

    /// Upper bound, in seconds, on waiting for the page to finish loading.
    #[serde(default = "default_maximum_wait")]
    pub maximum_wait_page_load_time: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            highlight_elements: true,
            viewport_expansion: default_viewport_expansion(),
            include_dynamic_attributes: true,
            keep_alive: false,
            allowed_domains: None,
            minimum_wait_page_load_time: default_minimum_wait(),
            maximum_wait_page_load_time: default_maximum_wait(),
        }
    }
}

/// Longest page-load wait accepted, in seconds.
pub const MAX_WAIT_SECS: f64 = 3600.0;

impl ContextConfig {
    pub fn minimum_wait(&self) -> Duration {
        wait_duration(self.minimum_wait_page_load_time, default_minimum_wait())
    }

    pub fn maximum_wait(&self) -> Duration {
        wait_duration(self.maximum_wait_page_load_time, default_maximum_wait())
    }
}

/// Clamp to `0..=MAX_WAIT_SECS`; NaN falls back to `default`.
fn wait_duration(secs: f64, default: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_WAIT_SECS))
        .unwrap_or_else(|_| Duration::from_secs_f64(default))
}

fn default_viewport_expansion() -> i64 {
    500
}

fn default_minimum_wait() -> f64 {
    0.25
}

fn default_maximum_wait() -> f64 {
    5.0
}

/// Which attributes count toward an interactive element's hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Attributes never hashed because they change without changing meaning.
    #[serde(default = "default_excluded_attributes")]
    pub excluded_attributes: Vec<String>,

    /// When set, only these attributes are hashed (exclusions still apply).
    #[serde(default)]
    pub included_attributes: Option<Vec<String>>,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            excluded_attributes: default_excluded_attributes(),
            included_attributes: None,
        }
    }
}

/// Default volatile attributes excluded from element hashes.
pub fn default_excluded_attributes() -> Vec<String> {
    [
        "style",
        "data-highlight-index",
        "pagelens-highlight-id",
        "data-reactid",
        "data-react-checksum",
        "data-v-app",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
