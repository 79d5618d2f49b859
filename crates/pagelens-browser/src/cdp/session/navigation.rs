//! Navigation and history for a page session.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;

use super::core::PageSession;

const READY_POLL: Duration = Duration::from_millis(100);

impl PageSession {
    /// Navigate and wait up to `timeout` for the new document to be ready.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result["errorText"].as_str().filter(|e| !e.is_empty()) {
            return Err(CdpError::NavigationFailed(format!("{}: {}", url, error)));
        }

        self.settle(timeout).await?;
        debug!("Navigated {} to {}", self.target_id, url);
        Ok(())
    }

    /// Poll `document.readyState` until it is past `loading`.
    ///
    /// Unbounded; callers wrap it in [`PageSession::settle`].
    pub(crate) async fn wait_until_ready(&self) -> Result<(), CdpError> {
        loop {
            let state = self.evaluate("document.readyState").await?;
            if matches!(state.as_str(), Some("interactive" | "complete")) {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    pub async fn reload(&self, timeout: Duration) -> Result<(), CdpError> {
        self.call("Page.reload", None).await?;
        self.settle(timeout).await
    }

    /// Step one entry back in history. A no-op on the first entry.
    pub async fn go_back(&self, timeout: Duration) -> Result<(), CdpError> {
        let history = self.call("Page.getNavigationHistory", None).await?;
        let Some(current) = history["currentIndex"].as_u64().filter(|i| *i > 0) else {
            return Ok(());
        };
        let Some(entry_id) = history["entries"][current as usize - 1]["id"].as_i64() else {
            return Ok(());
        };

        self.call(
            "Page.navigateToHistoryEntry",
            Some(json!({"entryId": entry_id})),
        )
        .await?;
        self.settle(timeout).await
    }

    pub async fn current_url(&self) -> Result<String, CdpError> {
        self.evaluate_string("window.location.href").await
    }

    pub async fn current_title(&self) -> Result<String, CdpError> {
        self.evaluate_string("document.title").await
    }
}
