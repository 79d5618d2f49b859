//! Browser connection configuration.

use serde::{Deserialize, Serialize};

/// How to reach the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Remote debugging endpoint of an already running browser
    /// (e.g. `http://localhost:9222`). When set, tabs are additionally
    /// tracked by their remote target id.
    #[serde(default)]
    pub cdp_url: Option<String>,

    /// Debugging port used when no `cdp_url` is given.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Timeout for a single protocol request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cdp_url: None,
            debug_port: default_debug_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BrowserConfig {
    /// The HTTP endpoint the CDP client discovers the browser through.
    pub fn endpoint(&self) -> String {
        match self.cdp_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.debug_port),
        }
    }

    /// Whether tabs should be tracked by remote target id.
    pub fn tracks_remote_targets(&self) -> bool {
        self.cdp_url.is_some()
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_request_timeout() -> u64 {
    30
}
