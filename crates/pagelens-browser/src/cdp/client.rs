//! Browser-level CDP client: endpoint discovery and target management.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpResponse, TargetInfo};
use super::session::PageSession;
use super::transport::Transport;

/// Default bound on a single CDP round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection to the browser endpoint of a running Chrome.
pub struct CdpClient {
    browser_ws_url: String,
    transport: Arc<Transport>,
    pump: JoinHandle<()>,
}

impl CdpClient {
    /// Discover the browser WebSocket through `{endpoint}/json/version` and connect.
    ///
    /// ```rust,ignore
    /// let client = CdpClient::connect("http://localhost:9222", DEFAULT_REQUEST_TIMEOUT).await?;
    /// ```
    pub async fn connect(endpoint: &str, request_timeout: Duration) -> Result<Self, CdpError> {
        let endpoint = endpoint.trim_end_matches('/');
        let version = Self::discover(endpoint).await?;
        debug!("Discovered {} at {}", version.browser, endpoint);

        let (transport, pump) = Transport::open(&version.web_socket_debugger_url, request_timeout).await?;
        debug!("CDP client connected to {}", version.web_socket_debugger_url);

        Ok(Self {
            browser_ws_url: version.web_socket_debugger_url,
            transport,
            pump,
        })
    }

    async fn discover(endpoint: &str) -> Result<BrowserVersion, CdpError> {
        let unavailable = |e: reqwest::Error| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e));
        reqwest::get(format!("{}/json/version", endpoint))
            .await
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Send a browser-level command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport.call(method, params, None).await
    }

    /// Events not tied to a page session, such as target discovery.
    pub fn browser_events(&self) -> mpsc::UnboundedReceiver<CdpResponse> {
        self.transport.router().listen("")
    }

    pub async fn set_discover_targets(&self, discover: bool) -> Result<(), CdpError> {
        self.call("Target.setDiscoverTargets", Some(json!({"discover": discover})))
            .await?;
        Ok(())
    }

    /// Open a page target and return its id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call("Target.createTarget", Some(json!({"url": url})))
            .await?;
        let target_id = string_field(&result, "targetId")?;
        debug!("Created target {} for {}", target_id, url);
        Ok(target_id)
    }

    /// Attach a flat session to a page target and prepare it for snapshots.
    ///
    /// Page events are not routed; only command replies reach the session.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
            )
            .await?;
        let session_id = string_field(&result, "sessionId")?;

        let session = PageSession::new(target_id.to_string(), session_id, self.transport.clone());
        session.enable_domains().await?;
        Ok(session)
    }

    /// Detach a page session, leaving its target open.
    pub async fn detach_page(&self, session_id: &str) -> Result<(), CdpError> {
        self.call("Target.detachFromTarget", Some(json!({"sessionId": session_id})))
            .await?;
        Ok(())
    }

    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        Ok(serde_json::from_value(result["targetInfos"].clone())?)
    }

    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

fn string_field(result: &Value, field: &str) -> Result<String, CdpError> {
    result[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CdpError::InvalidResponse(format!("Missing {}", field)))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
