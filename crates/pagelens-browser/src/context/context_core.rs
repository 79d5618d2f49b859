//! BrowserContext core: struct definition, session lifecycle, current page.

use std::sync::Arc;

use pagelens_config::{ContextConfig, HashingConfig};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dom::{BuildOptions, ClickableElementProcessor, ClickableHashSet, HashPolicy};
use crate::driver::{BrowserDriver, PageEvent, PageRef, SessionRef};
use crate::error::BrowserError;

use super::{BrowserState, ContextState};

/// Live session and everything cached against it.
pub(super) struct SessionState {
    pub(super) driver: SessionRef,
    pub(super) events: mpsc::UnboundedReceiver<PageEvent>,
    pub(super) active_tab: Option<PageRef>,
    pub(super) cached_state: Option<Arc<BrowserState>>,
    pub(super) cached_hashes: Option<ClickableHashSet>,
}

/// Tracks the current page across tabs and navigations and produces snapshots.
///
/// All operations take `&mut self`; one request is in flight at a time.
pub struct BrowserContext {
    pub(super) browser: Arc<dyn BrowserDriver>,
    pub(super) config: ContextConfig,
    pub(super) processor: ClickableElementProcessor,
    pub(super) session: Option<SessionState>,
    pub(super) state: ContextState,
}

/// Browser-internal pages the agent never works in.
pub(crate) fn is_internal_url(url: &str) -> bool {
    ["chrome://", "chrome-extension://", "devtools://"]
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

impl BrowserContext {
    /// Create a tracker. No connection is made until first use.
    pub fn new(browser: Arc<dyn BrowserDriver>, config: ContextConfig, hashing: HashingConfig) -> Self {
        Self {
            browser,
            config,
            processor: ClickableElementProcessor::new(HashPolicy::from_config(&hashing)),
            session: None,
            state: ContextState::default(),
        }
    }

    /// Resume with previously saved tracker state.
    pub fn with_state(mut self, state: ContextState) -> Self {
        self.state = state;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub(super) fn build_options(&self) -> BuildOptions {
        BuildOptions::from_config(&self.config)
    }

    /// Open a session and choose the page to work in.
    pub async fn initialize_session(&mut self) -> Result<(), BrowserError> {
        info!("Initializing browser session");
        let driver = self.browser.new_session().await?;
        let events = driver.page_events();
        let pages = driver.pages().await?;
        let remote = self.browser.tracks_remote_targets();

        let mut active = None;
        if remote {
            if let Some(target_id) = self.state.target_id.as_deref() {
                active = Self::find_target_page(&driver, &pages, target_id).await;
            }
        }

        let page = match active {
            Some(page) => {
                debug!("Resuming target {}", page.id());
                page
            }
            None => {
                let mut reusable = None;
                if let Some(first) = pages.first() {
                    if !is_internal_url(&first.url().await?) {
                        reusable = Some(first.clone());
                    }
                }
                let page = match reusable {
                    Some(page) => {
                        debug!("Using existing page {}", page.id());
                        page
                    }
                    None => {
                        let page = driver.new_page().await?;
                        debug!("Created new page {}", page.id());
                        page
                    }
                };
                if remote {
                    self.state.target_id = Self::target_id_for(&driver, &page).await;
                }
                page
            }
        };

        if let Err(e) = page.bring_to_front().await {
            warn!("Failed to bring page to front: {}", e);
        }
        if let Err(e) = page.wait_for_load(self.config.maximum_wait()).await {
            warn!("Page did not finish loading: {}", e);
        }

        self.session = Some(SessionState {
            driver,
            events,
            active_tab: Some(page),
            cached_state: None,
            cached_hashes: None,
        });
        Ok(())
    }

    /// Apply page notifications queued since the last operation.
    ///
    /// A newly opened page that is not browser-internal becomes the active tab
    /// and invalidates the stored target id.
    pub fn drain_page_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let mut invalidated = false;
        while let Ok(event) = session.events.try_recv() {
            match event {
                PageEvent::Opened { page, url } => {
                    if session.active_tab.as_ref().is_some_and(|a| a.id() == page.id()) {
                        continue;
                    }
                    debug!("New page opened: {}", url);
                    if !is_internal_url(&url) {
                        session.active_tab = Some(page);
                    }
                    invalidated = true;
                }
            }
        }

        if invalidated {
            self.state.target_id = None;
        }
    }

    /// The page the agent is working in.
    ///
    /// Tried in order: the tracked target, the active tab, the most recently
    /// opened regular tab, and finally a new blank tab. A lost session is
    /// re-initialized and the lookup retried once.
    pub async fn get_current_page(&mut self) -> Result<PageRef, BrowserError> {
        self.drain_page_events();
        match self.resolve_current_page().await {
            Err(e) if e.is_session_lost() => {
                warn!("Browser session lost, reconnecting: {}", e);
                self.session = None;
                self.initialize_session().await?;
                self.resolve_current_page().await
            }
            other => other,
        }
    }

    async fn resolve_current_page(&mut self) -> Result<PageRef, BrowserError> {
        let driver = self.session_driver().await?;
        let pages = driver.pages().await?;

        if self.browser.tracks_remote_targets() {
            if let Some(target_id) = self.state.target_id.as_deref() {
                if let Some(page) = Self::find_target_page(&driver, &pages, target_id).await {
                    return Ok(page);
                }
            }
        }

        let session = self.session_state()?;
        if let Some(active) = &session.active_tab {
            if !active.is_closed() && pages.iter().any(|p| p.id() == active.id()) {
                return Ok(active.clone());
            }
        }

        for page in pages.iter().rev() {
            if !is_internal_url(&page.url().await?) {
                return Ok(page.clone());
            }
        }

        let page = driver.new_page().await?;
        debug!("No usable tab left, opened {}", page.id());
        self.session_state()?.active_tab = Some(page.clone());
        Ok(page)
    }

    /// Close the tracker. The browser session is closed unless `keep_alive` is set.
    pub async fn close(mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        drop(session.events);

        if !self.config.keep_alive {
            if let Err(e) = session.driver.close().await {
                warn!("Failed to close browser session: {}", e);
            }
        }
        info!("Browser context closed");
    }

    /// Driver of the live session, initializing one on first use.
    pub(super) async fn session_driver(&mut self) -> Result<SessionRef, BrowserError> {
        if self.session.is_none() {
            self.initialize_session().await?;
        }
        Ok(self.session_state()?.driver.clone())
    }

    pub(super) fn session_state(&mut self) -> Result<&mut SessionState, BrowserError> {
        self.session
            .as_mut()
            .ok_or_else(|| BrowserError::SessionLost("no browser session".to_string()))
    }

    /// Page whose target id is `target_id`, if that target still exists.
    async fn find_target_page(
        driver: &SessionRef,
        pages: &[PageRef],
        target_id: &str,
    ) -> Option<PageRef> {
        let targets = match driver.targets().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!("Failed to enumerate targets: {}", e);
                return None;
            }
        };

        let target = targets.iter().find(|t| t.is_page() && t.target_id == target_id)?;
        pages.iter().find(|p| p.id() == target.target_id).cloned()
    }

    /// Remote target id of `page`, matched by id and then by URL.
    pub(super) async fn target_id_for(driver: &SessionRef, page: &PageRef) -> Option<String> {
        let targets = match driver.targets().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!("Failed to enumerate targets: {}", e);
                return None;
            }
        };

        if let Some(target) = targets.iter().find(|t| t.is_page() && t.target_id == page.id()) {
            return Some(target.target_id.clone());
        }

        let url = page.url().await.ok()?;
        targets
            .iter()
            .find(|t| t.is_page() && t.url == url)
            .map(|t| t.target_id.clone())
    }
}
