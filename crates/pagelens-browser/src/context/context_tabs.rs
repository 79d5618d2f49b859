//! BrowserContext tab management, navigation and URL policy.

use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::BrowserError;

use super::{BrowserContext, TabInfo};

impl BrowserContext {
    /// Open tabs in session order.
    pub async fn get_tabs_info(&mut self) -> Result<Vec<TabInfo>, BrowserError> {
        self.drain_page_events();
        let driver = self.session_driver().await?;

        let mut tabs = Vec::new();
        for (page_id, page) in driver.pages().await?.iter().enumerate() {
            let url = page.url().await?;
            let title = page.title().await.unwrap_or_default();
            tabs.push(TabInfo {
                page_id,
                url,
                title,
                parent_page_id: None,
            });
        }
        Ok(tabs)
    }

    /// Make the tab at `page_id` current. Negative ids count from the end.
    pub async fn switch_to_tab(&mut self, page_id: i64) -> Result<(), BrowserError> {
        self.drain_page_events();
        let driver = self.session_driver().await?;
        let pages = driver.pages().await?;

        let count = pages.len() as i64;
        if count == 0 || page_id >= count {
            return Err(BrowserError::NoSuchTab(page_id));
        }
        let page = pages[page_id.rem_euclid(count) as usize].clone();

        let url = page.url().await?;
        if !self.is_url_allowed(&url) {
            return Err(BrowserError::UrlNotAllowed(url));
        }

        if self.browser.tracks_remote_targets() {
            self.state.target_id = Self::target_id_for(&driver, &page).await;
        }
        self.session_state()?.active_tab = Some(page.clone());

        if let Err(e) = page.bring_to_front().await {
            warn!("Failed to bring tab to front: {}", e);
        }
        if let Err(e) = page.wait_for_load(self.config.maximum_wait()).await {
            warn!("Tab did not finish loading: {}", e);
        }
        info!("Switched to tab {}: {}", page_id, url);
        Ok(())
    }

    /// Open a tab, optionally navigating it to `url`, and make it current.
    pub async fn create_new_tab(&mut self, url: Option<&str>) -> Result<(), BrowserError> {
        if let Some(url) = url {
            if !self.is_url_allowed(url) {
                return Err(BrowserError::UrlNotAllowed(url.to_string()));
            }
        }

        self.drain_page_events();
        let driver = self.session_driver().await?;
        let page = driver.new_page().await?;
        self.session_state()?.active_tab = Some(page.clone());

        if let Err(e) = page.wait_for_load(Duration::from_millis(500)).await {
            debug!("New tab not loaded yet: {}", e);
        }

        if let Some(url) = url {
            page.navigate(url, self.config.maximum_wait()).await?;
            if let Err(e) = self.wait_for_page_and_frames_load(Some(1.0)).await {
                warn!("New tab did not finish loading: {}", e);
            }
        }

        if self.browser.tracks_remote_targets() {
            self.state.target_id = Self::target_id_for(&driver, &page).await;
        }
        info!("Opened new tab {}", page.id());
        Ok(())
    }

    /// Navigate the current page.
    pub async fn navigate_to(&mut self, url: &str) -> Result<(), BrowserError> {
        if !self.is_url_allowed(url) {
            return Err(BrowserError::UrlNotAllowed(url.to_string()));
        }

        let page = self.get_current_page().await?;
        page.navigate(url, self.config.maximum_wait()).await?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    pub async fn go_back(&mut self) -> Result<(), BrowserError> {
        let page = self.get_current_page().await?;
        page.go_back(self.config.maximum_wait()).await?;
        debug!("Went back to {}", page.url().await.unwrap_or_default());
        Ok(())
    }

    pub async fn refresh_page(&mut self) -> Result<(), BrowserError> {
        let page = self.get_current_page().await?;
        page.reload(self.config.maximum_wait()).await?;
        Ok(())
    }

    /// Whether `url` may be opened under `allowed_domains`.
    ///
    /// Everything is allowed when no domains are configured. Otherwise the host
    /// must equal an allowed domain or be a subdomain of one. `about:blank` is
    /// always allowed.
    pub fn is_url_allowed(&self, url: &str) -> bool {
        let Some(allowed) = self.config.allowed_domains.as_deref() else {
            return true;
        };
        if url == "about:blank" {
            return true;
        }

        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        allowed.iter().any(|domain| {
            let domain = domain.trim().trim_start_matches("*.").to_ascii_lowercase();
            !domain.is_empty()
                && (host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|rest| rest.ends_with('.')))
        })
    }
}
