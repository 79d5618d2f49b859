//! Page session struct and command dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::transport::Transport;
use crate::dom::scripts::INIT_SCRIPT;

/// A flat session attached to a single page target.
pub struct PageSession {
    pub(super) target_id: String,
    pub(super) session_id: String,
    pub(super) transport: Arc<Transport>,
    /// Set once the target is destroyed or the connection drops.
    pub(super) closed: AtomicBool,
}

impl PageSession {
    pub(crate) fn new(target_id: String, session_id: String, transport: Arc<Transport>) -> Self {
        Self {
            target_id,
            session_id,
            transport,
            closed: AtomicBool::new(false),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Mark the page as gone. Further calls fail with `SessionClosed`.
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a command scoped to this page.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        if self.closed() {
            return Err(CdpError::SessionClosed);
        }
        self.transport
            .call(method, params, Some(&self.session_id))
            .await
    }

    /// Enable the domains snapshots rely on and install the listener probe.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        for domain in ["Page.enable", "DOM.enable", "Runtime.enable"] {
            self.call(domain, None).await?;
        }
        self.call(
            "Page.addScriptToEvaluateOnNewDocument",
            Some(json!({"source": INIT_SCRIPT})),
        )
        .await?;

        debug!("Session {} ready on target {}", self.session_id, self.target_id);
        Ok(())
    }

    /// Capture a PNG, base64 encoded as the protocol returns it.
    pub async fn capture_png(&self, full_page: bool) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({"format": "png", "captureBeyondViewport": full_page})),
            )
            .await?;

        result["data"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }

    pub async fn bring_to_front(&self) -> Result<(), CdpError> {
        self.call("Page.bringToFront", None).await?;
        Ok(())
    }

    /// Wait up to `timeout` for the document to become ready.
    pub(crate) async fn settle(&self, timeout: Duration) -> Result<(), CdpError> {
        tokio::time::timeout(timeout, self.wait_until_ready())
            .await
            .map_err(|_| CdpError::Timeout(format!("Page load exceeded {:?}", timeout)))?
    }
}
