//! BrowserContext snapshot assembly and page metrics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::dom::scripts;
use crate::dom::{ClickableHashSet, DomState, ElementRef, SelectorMap, TreeBuilder};
use crate::driver::PageDriver;
use crate::error::{BrowserError, DriverError};

use super::{BrowserContext, BrowserState};

impl BrowserContext {
    /// Snapshot the current page.
    ///
    /// With `cache_clickable_elements_hashes`, interactive elements not present
    /// in the previous snapshot of the same URL are flagged new, and this
    /// snapshot's hashes become the baseline for the next one.
    pub async fn get_state(
        &mut self,
        cache_clickable_elements_hashes: bool,
    ) -> Result<Arc<BrowserState>, BrowserError> {
        if let Err(e) = self.wait_for_page_and_frames_load(None).await {
            if e.is_session_lost() {
                return Err(e);
            }
            warn!("Page did not finish loading: {}", e);
        }

        let page = self.get_current_page().await?;
        let mut dom = match TreeBuilder::build(page.as_ref(), &self.build_options()).await {
            Ok(dom) => dom,
            Err(e) if e.is_session_lost() => return Err(e),
            Err(e) => {
                warn!("Failed to get clickable elements: {}", e);
                DomState::default()
            }
        };
        let url = match page.url().await {
            Ok(url) => url,
            Err(DriverError::SessionClosed) => return Err(DriverError::SessionClosed.into()),
            Err(e) => {
                warn!("Failed to read page url: {}", e);
                String::new()
            }
        };

        let hashes = if cache_clickable_elements_hashes {
            let previous = self.session_state()?.cached_hashes.clone();
            let flagged = self
                .processor
                .mark_new_elements(&mut dom.element_tree, &url, previous.as_ref());
            debug!("{} new interactive elements", flagged);
            Some(ClickableHashSet {
                url: url.clone(),
                hashes: self.processor.get_clickable_elements_hashes(&dom.element_tree),
            })
        } else {
            None
        };

        let screenshot = match self.capture_screenshot(page.as_ref(), false).await {
            Ok(screenshot) => Some(screenshot),
            Err(e) => {
                warn!("Failed to take screenshot: {}", e);
                None
            }
        };
        let (pixels_above, pixels_below) =
            self.get_scroll_info(page.as_ref()).await.unwrap_or_else(|e| {
                warn!("Failed to get scroll info: {}", e);
                (0, 0)
            });
        let title = page.title().await.unwrap_or_else(|e| {
            warn!("Failed to get page title: {}", e);
            String::new()
        });
        // Last: listing tabs may switch the current page to a new popup.
        let tabs = self.get_tabs_info().await.unwrap_or_else(|e| {
            warn!("Failed to list tabs: {}", e);
            Vec::new()
        });

        let state = Arc::new(BrowserState {
            element_tree: Arc::new(dom.element_tree),
            selector_map: dom.selector_map,
            url,
            title,
            tabs,
            screenshot,
            pixels_above,
            pixels_below,
            browser_errors: Vec::new(),
        });

        let session = self.session_state()?;
        if hashes.is_some() {
            session.cached_hashes = hashes;
        }
        session.cached_state = Some(state.clone());
        Ok(state)
    }

    /// Base64 PNG of the current page.
    pub async fn take_screenshot(&mut self, full_page: bool) -> Result<String, BrowserError> {
        let page = self.get_current_page().await?;
        self.capture_screenshot(page.as_ref(), full_page).await
    }

    async fn capture_screenshot(
        &self,
        page: &dyn PageDriver,
        full_page: bool,
    ) -> Result<String, BrowserError> {
        page.bring_to_front().await?;
        page.wait_for_load(self.config.maximum_wait()).await?;

        let png = page.screenshot(full_page).await?;
        Ok(STANDARD.encode(png))
    }

    /// Pixels above and below the viewport.
    pub async fn get_scroll_info(&self, page: &dyn PageDriver) -> Result<(u64, u64), BrowserError> {
        let metrics = page.scroll_metrics().await?;
        Ok((metrics.pixels_above(), metrics.pixels_below()))
    }

    /// Remove index overlays from the current page. Failures are logged.
    pub async fn remove_highlights(&mut self) {
        let page = match self.get_current_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to remove highlights: {}", e);
                return;
            }
        };

        if let Err(e) = page.evaluate(&scripts::invoke_bare(scripts::REMOVE_HIGHLIGHTS)).await {
            warn!("Failed to remove highlights (this is usually ok): {}", e);
        }
    }

    /// Wait for the current page to load.
    ///
    /// Takes at least `minimum_wait_page_load_time`. Loading longer than
    /// `maximum_wait_page_load_time`, or `timeout_override` seconds when given,
    /// is a [`BrowserError::Timeout`].
    pub async fn wait_for_page_and_frames_load(
        &mut self,
        timeout_override: Option<f64>,
    ) -> Result<(), BrowserError> {
        let started = Instant::now();
        let minimum = self.config.minimum_wait();
        let maximum = timeout_override
            .and_then(|secs| Duration::try_from_secs_f64(secs.max(0.0)).ok())
            .unwrap_or_else(|| self.config.maximum_wait());

        let page = self.get_current_page().await?;
        match tokio::time::timeout(maximum, page.wait_for_load(maximum)).await {
            Ok(Ok(())) => {}
            Ok(Err(DriverError::Timeout(_))) | Err(_) => {
                return Err(BrowserError::Timeout(format!(
                    "Page did not load within {:.2}s",
                    maximum.as_secs_f64()
                )));
            }
            Ok(Err(e)) => return Err(e.into()),
        }

        let remaining = minimum.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
        debug!("Page loaded in {:?}", started.elapsed());
        Ok(())
    }

    /// Latest snapshot, if any was taken in this session.
    pub fn cached_state(&self) -> Option<Arc<BrowserState>> {
        self.session.as_ref()?.cached_state.clone()
    }

    /// Selector map of the latest snapshot; empty before the first one.
    pub fn get_selector_map(&self) -> SelectorMap {
        self.cached_state()
            .map(|state| state.selector_map.clone())
            .unwrap_or_default()
    }

    /// Element with `index` in the latest snapshot.
    pub fn get_dom_element_by_index(&self, index: usize) -> Result<ElementRef, BrowserError> {
        let missing = || {
            BrowserError::NotFound(format!(
                "element with index {} does not exist - retry or use alternative actions",
                index
            ))
        };

        let state = self.cached_state().ok_or_else(missing)?;
        let id = *state.selector_map.get(&index).ok_or_else(missing)?;
        ElementRef::new(state.element_tree.clone(), id).ok_or_else(missing)
    }
}
