//! Scripted in-process driver for exercising the tracker without a browser.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pagelens_browser::driver::{
    BrowserDriver, FrameScope, NodeRef, PageDriver, PageEvent, PageRef, RemoteTarget,
    ScrollMetrics, SessionDriver, SessionRef,
};
use pagelens_browser::{BrowserContext, DriverError};
use pagelens_config::{ContextConfig, HashingConfig};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

// ============================================================================
// Page
// ============================================================================

pub struct FakePage {
    id: String,
    url: Mutex<String>,
    title: Mutex<String>,
    closed: AtomicBool,
    stalled: AtomicBool,
    url_fails: AtomicBool,
    snapshot: Mutex<Option<Value>>,
    scroll: Mutex<ScrollMetrics>,
    frames: Mutex<HashMap<(FrameScope, String), FrameScope>>,
    selectors: Mutex<HashMap<(FrameScope, String), Vec<NodeRef>>>,
    xpaths: Mutex<HashMap<(FrameScope, String), NodeRef>>,
    values: Mutex<HashMap<NodeRef, String>>,
    pub clicks: Mutex<Vec<NodeRef>>,
    pub evaluated: Mutex<Vec<String>>,
    pub navigations: Mutex<Vec<String>>,
    pub fronted: AtomicUsize,
    pub shots: AtomicUsize,
    on_collect: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl FakePage {
    pub fn new(id: &str, url: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            url: Mutex::new(url.to_string()),
            title: Mutex::new(String::new()),
            closed: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            url_fails: AtomicBool::new(false),
            snapshot: Mutex::new(None),
            scroll: Mutex::new(ScrollMetrics {
                scroll_y: 0.0,
                viewport_height: 720.0,
                document_height: 720.0,
            }),
            frames: Mutex::new(HashMap::new()),
            selectors: Mutex::new(HashMap::new()),
            xpaths: Mutex::new(HashMap::new()),
            values: Mutex::new(HashMap::new()),
            clicks: Mutex::new(Vec::new()),
            evaluated: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            fronted: AtomicUsize::new(0),
            shots: AtomicUsize::new(0),
            on_collect: Mutex::new(None),
        })
    }

    pub fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    pub fn set_url(&self, url: &str) {
        *self.url.lock() = url.to_string();
    }

    /// Output of the collection script. `None` makes it fail.
    pub fn set_snapshot(&self, snapshot: Option<Value>) {
        *self.snapshot.lock() = snapshot;
    }

    /// Run `hook` each time the collection script is evaluated.
    pub fn on_collect(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_collect.lock() = Some(Box::new(hook));
    }

    pub fn set_scroll(&self, scroll_y: f64, viewport_height: f64, document_height: f64) {
        *self.scroll.lock() = ScrollMetrics {
            scroll_y,
            viewport_height,
            document_height,
        };
    }

    pub fn add_frame(&self, scope: FrameScope, selector: &str, frame: FrameScope) {
        self.frames.lock().insert((scope, selector.to_string()), frame);
    }

    pub fn add_selector(&self, scope: FrameScope, selector: &str, nodes: &[i64]) {
        self.selectors.lock().insert(
            (scope, selector.to_string()),
            nodes.iter().map(|&n| NodeRef(n)).collect(),
        );
    }

    pub fn add_xpath(&self, scope: FrameScope, xpath: &str, node: i64) {
        self.xpaths.lock().insert((scope, xpath.to_string()), NodeRef(node));
    }

    /// Loads never finish; navigation fails once its bound runs out.
    pub fn stall_loads(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// `url()` fails with a JavaScript error while the page stays open.
    pub fn fail_url(&self) {
        self.url_fails.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn check_open(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn check_load(&self, timeout: Duration) -> Result<(), DriverError> {
        if self.stalled.load(Ordering::SeqCst) {
            Err(DriverError::Timeout(format!("Page load exceeded {:?}", timeout)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn url(&self) -> Result<String, DriverError> {
        self.check_open()?;
        if self.url_fails.load(Ordering::SeqCst) {
            return Err(DriverError::JavaScript("location unavailable".to_string()));
        }
        Ok(self.url.lock().clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.check_open()?;
        Ok(self.title.lock().clone())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.check_open()?;
        self.navigations.lock().push(url.to_string());
        self.set_url(url);
        self.check_load(timeout)
    }

    async fn go_back(&self, timeout: Duration) -> Result<(), DriverError> {
        self.check_open()?;
        let previous = {
            let mut navigations = self.navigations.lock();
            navigations.pop();
            navigations.last().cloned()
        };
        self.set_url(previous.as_deref().unwrap_or("about:blank"));
        self.check_load(timeout)
    }

    async fn reload(&self, timeout: Duration) -> Result<(), DriverError> {
        self.check_open()?;
        self.check_load(timeout)
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError> {
        self.check_open()?;
        self.check_load(timeout)
    }

    async fn bring_to_front(&self) -> Result<(), DriverError> {
        self.check_open()?;
        self.fronted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        self.check_open()?;
        self.evaluated.lock().push(expression.to_string());

        if expression.contains("{\"maxNodes\":") {
            if let Some(hook) = self.on_collect.lock().as_ref() {
                hook();
            }
            return self
                .snapshot
                .lock()
                .clone()
                .ok_or_else(|| DriverError::JavaScript("collection failed".to_string()));
        }
        if expression.contains("documentHeight") {
            let scroll = *self.scroll.lock();
            return Ok(json!({
                "scrollY": scroll.scroll_y,
                "viewportHeight": scroll.viewport_height,
                "documentHeight": scroll.document_height,
            }));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.check_open()?;
        self.shots.fetch_add(1, Ordering::SeqCst);
        Ok(b"\x89PNG".to_vec())
    }

    async fn resolve_frame(
        &self,
        scope: FrameScope,
        selector: &str,
    ) -> Result<Option<FrameScope>, DriverError> {
        self.check_open()?;
        Ok(self.frames.lock().get(&(scope, selector.to_string())).copied())
    }

    async fn query_selector_all(
        &self,
        scope: FrameScope,
        selector: &str,
    ) -> Result<Vec<NodeRef>, DriverError> {
        self.check_open()?;
        Ok(self
            .selectors
            .lock()
            .get(&(scope, selector.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn query_xpath(
        &self,
        scope: FrameScope,
        xpath: &str,
    ) -> Result<Option<NodeRef>, DriverError> {
        self.check_open()?;
        Ok(self.xpaths.lock().get(&(scope, xpath.to_string())).copied())
    }

    async fn click(&self, node: NodeRef) -> Result<(), DriverError> {
        self.check_open()?;
        self.clicks.lock().push(node);
        Ok(())
    }

    async fn input_value(&self, node: NodeRef) -> Result<String, DriverError> {
        self.check_open()?;
        Ok(self.values.lock().get(&node).cloned().unwrap_or_default())
    }

    async fn set_input_value(&self, node: NodeRef, value: &str) -> Result<(), DriverError> {
        self.check_open()?;
        self.values.lock().insert(node, value.to_string());
        Ok(())
    }

    async fn wait_for_visible(&self, _node: NodeRef, _timeout: Duration) -> Result<(), DriverError> {
        self.check_open()
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Default)]
pub struct FakeSession {
    pages: Mutex<Vec<Arc<FakePage>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PageEvent>>>,
    created: AtomicUsize,
    lost: AtomicBool,
    pub closed: AtomicBool,
}

impl FakeSession {
    pub fn with_pages(urls: &[&str]) -> Arc<Self> {
        let session = Arc::new(Self::default());
        for url in urls {
            session.add_page(url);
        }
        session
    }

    /// Add a page without notifying subscribers.
    pub fn add_page(&self, url: &str) -> Arc<FakePage> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let page = FakePage::new(&format!("TARGET-{}", n), url);
        self.pages.lock().push(page.clone());
        page
    }

    /// Add a page and announce it, as a popup or user-opened tab would be.
    pub fn open_popup(&self, url: &str) -> Arc<FakePage> {
        let page = self.add_page(url);
        let event_page: PageRef = page.clone();
        self.subscribers.lock().retain(|tx| {
            tx.send(PageEvent::Opened {
                page: event_page.clone(),
                url: url.to_string(),
            })
            .is_ok()
        });
        page
    }

    pub fn page(&self, index: usize) -> Arc<FakePage> {
        self.pages.lock()[index].clone()
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Make every call fail as if the connection dropped.
    pub fn lose(&self) {
        self.lost.store(true, Ordering::SeqCst);
        for page in self.pages.lock().iter() {
            page.close();
        }
    }

    fn check_alive(&self) -> Result<(), DriverError> {
        if self.lost.load(Ordering::SeqCst) {
            Err(DriverError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionDriver for FakeSession {
    async fn pages(&self) -> Result<Vec<PageRef>, DriverError> {
        self.check_alive()?;
        Ok(self
            .pages
            .lock()
            .iter()
            .filter(|p| !p.is_closed())
            .map(|p| p.clone() as PageRef)
            .collect())
    }

    async fn new_page(&self) -> Result<PageRef, DriverError> {
        self.check_alive()?;
        Ok(self.add_page("about:blank") as PageRef)
    }

    fn page_events(&self) -> mpsc::UnboundedReceiver<PageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    async fn targets(&self) -> Result<Vec<RemoteTarget>, DriverError> {
        self.check_alive()?;
        Ok(self
            .pages
            .lock()
            .iter()
            .filter(|p| !p.is_closed())
            .map(|p| RemoteTarget {
                target_id: p.id.clone(),
                url: p.url.lock().clone(),
                target_type: "page".to_string(),
            })
            .collect())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Browser
// ============================================================================

/// Hands out prepared sessions in order, then empty ones.
pub struct FakeBrowser {
    queued: Mutex<VecDeque<Arc<FakeSession>>>,
    pub opened: Mutex<Vec<Arc<FakeSession>>>,
    remote: bool,
}

impl FakeBrowser {
    pub fn new(sessions: Vec<Arc<FakeSession>>) -> Arc<Self> {
        Self::build(sessions, false)
    }

    pub fn remote(sessions: Vec<Arc<FakeSession>>) -> Arc<Self> {
        Self::build(sessions, true)
    }

    fn build(sessions: Vec<Arc<FakeSession>>, remote: bool) -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(sessions.into()),
            opened: Mutex::new(Vec::new()),
            remote,
        })
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.lock().len()
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn new_session(&self) -> Result<SessionRef, DriverError> {
        let session = self.queued.lock().pop_front().unwrap_or_default();
        self.opened.lock().push(session.clone());
        Ok(session as SessionRef)
    }

    fn tracks_remote_targets(&self) -> bool {
        self.remote
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn test_config() -> ContextConfig {
    ContextConfig {
        minimum_wait_page_load_time: 0.0,
        maximum_wait_page_load_time: 1.0,
        ..Default::default()
    }
}

pub fn context_for(browser: Arc<FakeBrowser>, config: ContextConfig) -> BrowserContext {
    BrowserContext::new(browser, config, HashingConfig::default())
}

/// Raw element node as reported by the collection script.
pub fn el(parent: Option<usize>, tag: &str, xpath: &str, y: f64) -> Value {
    json!({
        "parent": parent,
        "type": "element",
        "tag": tag,
        "attributes": {},
        "xpath": xpath,
        "visible": true,
        "top": true,
        "rect": {"x": 10.0, "y": y, "width": 120.0, "height": 24.0},
        "cursor": "auto",
        "listeners": false,
        "shadowRoot": false
    })
}

pub fn text(parent: usize, s: &str) -> Value {
    json!({"parent": parent, "type": "text", "text": s, "visible": true})
}

pub fn snapshot(nodes: Vec<Value>) -> Value {
    json!({
        "viewport": {"width": 1280.0, "height": 720.0},
        "nodes": nodes,
        "truncated": false
    })
}

/// html > body > button "Submit"
pub fn button_page() -> Vec<Value> {
    vec![
        el(None, "html", "/html", 0.0),
        el(Some(0), "body", "/html/body", 0.0),
        el(Some(1), "button", "/html/body/button", 40.0),
        text(2, "Submit"),
    ]
}
