//! Chrome DevTools Protocol (CDP) driver.
//!
//! A pure Rust CDP client that connects to an already running Chrome/Chromium
//! over WebSocket and implements the [`crate::driver`] traits on top of it.
//!
//! ## Usage
//!
//! 1. Start Chrome with remote debugging:
//!    ```bash
//!    chrome --remote-debugging-port=9222
//!    ```
//!
//! 2. Hand a driver to the browser context:
//!    ```rust,ignore
//!    let browser = CdpBrowser::from_config(&config.browser);
//!    let mut context = BrowserContext::new(Arc::new(browser), config.context, config.hashing);
//!    let state = context.get_state(true).await?;
//!    ```

mod browser;
mod client;
mod error;
#[cfg(test)]
mod fake_chrome;
mod protocol;
mod session;
mod transport;

pub use browser::{CdpBrowser, CdpSession};
pub use client::{CdpClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
