//! Capability traits the snapshot engine consumes from a browser driver.
//!
//! The CDP implementation lives in [`crate::cdp`]; tests plug in a scripted
//! in-process driver. Everything above this module talks to the browser only
//! through these traits.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::DriverError;

/// Shared handle to a live page.
pub type PageRef = Arc<dyn PageDriver>;

/// Shared handle to a live browser session.
pub type SessionRef = Arc<dyn SessionDriver>;

/// Document an element lookup is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameScope {
    /// The page's top-level document.
    Top,
    /// The content document of an iframe, by driver node handle.
    Frame(i64),
}

/// Driver-side handle of a live DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub i64);

/// Asynchronous notification pushed by a session.
pub enum PageEvent {
    /// A page was opened by the user or by a script. `url` is the address it
    /// was opened with, as reported by the driver.
    Opened { page: PageRef, url: String },
}

impl fmt::Debug for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageEvent::Opened { page, url } => f
                .debug_struct("Opened")
                .field("page", &page.id())
                .field("url", url)
                .finish(),
        }
    }
}

/// Scroll position and size of a page's main document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    /// Pixels scrolled past above the viewport.
    pub fn pixels_above(&self) -> u64 {
        self.scroll_y.max(0.0) as u64
    }

    /// Pixels of content remaining below the viewport.
    pub fn pixels_below(&self) -> u64 {
        (self.document_height - (self.scroll_y + self.viewport_height)).max(0.0) as u64
    }
}

/// Target enumerated over the remote debugging transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub target_id: String,
    pub url: String,
    pub target_type: String,
}

impl RemoteTarget {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

/// Connects to a browser and opens sessions on it.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a new automation session.
    async fn new_session(&self) -> Result<SessionRef, DriverError>;

    /// Whether targets are tracked over a remote debugging endpoint.
    fn tracks_remote_targets(&self) -> bool {
        false
    }
}

/// A live browser session holding a set of pages.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Open pages, in the order they were opened.
    async fn pages(&self) -> Result<Vec<PageRef>, DriverError>;

    /// Open a new blank page.
    async fn new_page(&self) -> Result<PageRef, DriverError>;

    /// Subscribe to page events. Each call returns an independent receiver.
    fn page_events(&self) -> mpsc::UnboundedReceiver<PageEvent>;

    /// Enumerate remote debugging targets.
    async fn targets(&self) -> Result<Vec<RemoteTarget>, DriverError> {
        Err(DriverError::Unsupported("target enumeration".to_string()))
    }

    /// Close the session and every page it owns.
    async fn close(&self) -> Result<(), DriverError>;
}

/// A single live page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Stable identifier of the page. Equals the remote target id for CDP.
    fn id(&self) -> &str;

    fn is_closed(&self) -> bool;

    async fn url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    /// Load `url` and wait, bounded by `timeout`, for the new document.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Step back one history entry. Same load bound as [`PageDriver::navigate`].
    async fn go_back(&self, timeout: Duration) -> Result<(), DriverError>;

    async fn reload(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Wait until the document finished loading, bounded by `timeout`.
    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError>;

    async fn bring_to_front(&self) -> Result<(), DriverError>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;

    async fn scroll_metrics(&self) -> Result<ScrollMetrics, DriverError> {
        let value = self
            .evaluate(
                "({scrollY: window.scrollY, viewportHeight: window.innerHeight, \
                 documentHeight: document.documentElement.scrollHeight})",
            )
            .await?;
        serde_json::from_value(value).map_err(|e| DriverError::InvalidResponse(e.to_string()))
    }

    /// Capture a PNG screenshot.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError>;

    /// Resolve the iframe matched by `selector` in `scope` to its content document.
    ///
    /// Returns `None` unless exactly one iframe with a loaded document matches.
    async fn resolve_frame(
        &self,
        scope: FrameScope,
        selector: &str,
    ) -> Result<Option<FrameScope>, DriverError>;

    /// All elements matching a CSS selector in `scope`, in document order.
    async fn query_selector_all(
        &self,
        scope: FrameScope,
        selector: &str,
    ) -> Result<Vec<NodeRef>, DriverError>;

    /// First element matching an absolute XPath in `scope`.
    async fn query_xpath(
        &self,
        scope: FrameScope,
        xpath: &str,
    ) -> Result<Option<NodeRef>, DriverError>;

    async fn click(&self, node: NodeRef) -> Result<(), DriverError>;

    async fn input_value(&self, node: NodeRef) -> Result<String, DriverError>;

    async fn set_input_value(&self, node: NodeRef, value: &str) -> Result<(), DriverError>;

    /// Wait until the node is rendered with a non-empty box, bounded by `timeout`.
    async fn wait_for_visible(&self, node: NodeRef, timeout: Duration) -> Result<(), DriverError>;
}
