//! Page snapshots and element indexing for browser agents.
//!
//! Reduces a live page to a compact tree of the elements an agent can act on,
//! numbers them in document order, flags the ones that appeared since the
//! previous step, and resolves a chosen index back onto the live page, through
//! nested frames if needed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   driver traits   ┌─────────────┐   WebSocket   ┌──────────────┐
//! │  BrowserContext  │ ◄───────────────► │  CdpBrowser │ ◄───────────► │ Chrome/Edge  │
//! │  (tabs, state)   │                   │  (cdp)      │      CDP      │              │
//! └──────────────────┘                   └─────────────┘               └──────────────┘
//!          │
//!          ▼
//!   TreeBuilder → DomTree + SelectorMap → ClickableElementProcessor → BrowserState
//! ```
//!
//! ## Setup
//!
//! Start Chrome with remote debugging enabled:
//!
//! ```bash
//! google-chrome --remote-debugging-port=9222
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let browser = CdpBrowser::from_config(&config.browser);
//! let mut context = BrowserContext::new(Arc::new(browser), config.context, config.hashing);
//!
//! let state = context.get_state(true).await?;
//! println!("{}", state.element_tree.clickable_elements_to_string(&["type", "name"]));
//!
//! let element = context.get_dom_element_by_index(0)?;
//! context.get_locate_element(&element).await?.click().await?;
//! ```

pub mod cdp;
pub mod context;
pub mod dom;
pub mod driver;
mod error;

pub use cdp::{CdpBrowser, CdpError};
pub use context::{BrowserContext, BrowserState, ContextState, ElementHandle, TabInfo};
pub use dom::{
    BuildOptions, ClickableElementProcessor, ClickableHashSet, DomState, DomTree, ElementData,
    ElementRef, HashPolicy, NodeId, NodeKind, SelectorMap, TreeBuilder,
};
pub use driver::{BrowserDriver, FrameScope, NodeRef, PageDriver, PageEvent, SessionDriver};
pub use error::{BrowserError, DriverError};
