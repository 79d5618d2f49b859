//! Browser and session drivers over a CDP connection.
//!
//! A [`CdpSession`] attaches to every page target of an already running
//! browser and keeps that set current from `Target.*` discovery events.
//! Closing it closes only the tabs it opened and detaches from the rest.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagelens_config::BrowserConfig;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, PageEvent, PageRef, RemoteTarget, SessionDriver, SessionRef};
use crate::error::DriverError;

use super::client::CdpClient;
use super::error::CdpError;
use super::protocol::{CdpResponse, TargetInfo};
use super::session::PageSession;

type TrackedPages = Arc<tokio::sync::Mutex<Vec<Arc<PageSession>>>>;
type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<PageEvent>>>>;

/// Connects to a browser exposing a remote debugging endpoint.
#[derive(Debug, Clone)]
pub struct CdpBrowser {
    endpoint: String,
    request_timeout: Duration,
    remote: bool,
}

impl CdpBrowser {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout,
            remote: false,
        }
    }

    /// Build from the `[browser]` configuration section.
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            remote: config.tracks_remote_targets(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BrowserDriver for CdpBrowser {
    async fn new_session(&self) -> Result<SessionRef, DriverError> {
        let session = CdpSession::connect(&self.endpoint, self.request_timeout).await?;
        Ok(Arc::new(session) as SessionRef)
    }

    fn tracks_remote_targets(&self) -> bool {
        self.remote
    }
}

/// Live CDP session over all page targets of one browser.
pub struct CdpSession {
    client: Arc<CdpClient>,
    pages: TrackedPages,
    /// Targets opened through [`SessionDriver::new_page`].
    created: Mutex<HashSet<String>>,
    subscribers: Subscribers,
    _watch_task: tokio::task::JoinHandle<()>,
}

impl CdpSession {
    /// Connect and attach to every existing page target.
    pub async fn connect(endpoint: &str, request_timeout: Duration) -> Result<Self, CdpError> {
        let client = Arc::new(CdpClient::connect(endpoint, request_timeout).await?);
        let events = client.browser_events();
        let pages: TrackedPages = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        for target in client.get_targets().await? {
            if target.target_type != "page" {
                continue;
            }
            if let Err(e) = Self::track(&client, &pages, &target.target_id).await {
                warn!("Failed to attach to target {}: {}", target.target_id, e);
            }
        }

        client.set_discover_targets(true).await?;

        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));
        let watch_task = tokio::spawn(Self::watch_targets(
            client.clone(),
            pages.clone(),
            subscribers.clone(),
            events,
        ));

        info!(
            "CDP session on {} tracking {} pages",
            client.browser_ws_url(),
            pages.lock().await.len()
        );

        Ok(Self {
            client,
            pages,
            created: Mutex::new(HashSet::new()),
            subscribers,
            _watch_task: watch_task,
        })
    }

    /// Attach to a target unless it is already tracked.
    ///
    /// Returns the page and whether this call attached it.
    async fn track(
        client: &CdpClient,
        pages: &TrackedPages,
        target_id: &str,
    ) -> Result<(Arc<PageSession>, bool), CdpError> {
        let mut tracked = pages.lock().await;
        if let Some(page) = tracked.iter().find(|p| p.target_id() == target_id) {
            return Ok((page.clone(), false));
        }

        let page = Arc::new(client.attach_page(target_id).await?);
        tracked.push(page.clone());
        debug!("Attached to page target {}", target_id);
        Ok((page, true))
    }

    /// Follow target creation and destruction for the lifetime of the session.
    async fn watch_targets(
        client: Arc<CdpClient>,
        pages: TrackedPages,
        subscribers: Subscribers,
        mut events: mpsc::UnboundedReceiver<CdpResponse>,
    ) {
        while let Some(event) = events.recv().await {
            let params = event.params.unwrap_or_default();
            match event.method.as_deref() {
                Some("Target.targetCreated") => {
                    let Ok(info) = serde_json::from_value::<TargetInfo>(params["targetInfo"].clone())
                    else {
                        continue;
                    };
                    if info.target_type != "page" {
                        continue;
                    }

                    match Self::track(&client, &pages, &info.target_id).await {
                        Ok((page, true)) => {
                            let page: PageRef = page;
                            subscribers.lock().retain(|tx| {
                                tx.send(PageEvent::Opened {
                                    page: page.clone(),
                                    url: info.url.clone(),
                                })
                                .is_ok()
                            });
                        }
                        Ok((_, false)) => {}
                        Err(e) => warn!("Failed to attach to new target {}: {}", info.target_id, e),
                    }
                }
                Some("Target.targetDestroyed") => {
                    let Some(target_id) = params["targetId"].as_str() else {
                        continue;
                    };

                    let removed = {
                        let mut tracked = pages.lock().await;
                        tracked
                            .iter()
                            .position(|p| p.target_id() == target_id)
                            .map(|pos| tracked.remove(pos))
                    };

                    if let Some(page) = removed {
                        page.mark_closed();
                        debug!("Page target {} destroyed", target_id);
                    }
                }
                _ => {}
            }
        }

        // Connection gone: every tracked page is dead.
        for page in pages.lock().await.drain(..) {
            page.mark_closed();
        }
    }
}

#[async_trait]
impl SessionDriver for CdpSession {
    async fn pages(&self) -> Result<Vec<PageRef>, DriverError> {
        let tracked = self.pages.lock().await;
        Ok(tracked
            .iter()
            .filter(|p| !p.closed())
            .map(|p| p.clone() as PageRef)
            .collect())
    }

    async fn new_page(&self) -> Result<PageRef, DriverError> {
        let target_id = self.client.create_target("about:blank").await?;
        self.created.lock().insert(target_id.clone());
        let (page, _) = Self::track(&self.client, &self.pages, &target_id).await?;
        Ok(page as PageRef)
    }

    fn page_events(&self) -> mpsc::UnboundedReceiver<PageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    async fn targets(&self) -> Result<Vec<RemoteTarget>, DriverError> {
        let targets = self.client.get_targets().await?;
        Ok(targets
            .into_iter()
            .map(|t| RemoteTarget {
                target_id: t.target_id,
                url: t.url,
                target_type: t.target_type,
            })
            .collect())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let pages: Vec<_> = self.pages.lock().await.drain(..).collect();
        let created = std::mem::take(&mut *self.created.lock());
        for page in pages {
            page.mark_closed();
            let released = if created.contains(page.target_id()) {
                self.client.close_page(page.target_id()).await
            } else {
                self.client.detach_page(page.session_id()).await
            };
            if let Err(e) = released {
                warn!("Failed to release page {}: {}", page.target_id(), e);
            }
        }
        self.subscribers.lock().clear();
        info!("CDP session closed");
        Ok(())
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self._watch_task.abort();
    }
}
