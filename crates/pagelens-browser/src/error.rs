//! Error types for the driver boundary and the snapshot engine.

use thiserror::Error;

use crate::cdp::CdpError;

/// Errors reported by a browser driver implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The session or page went away underneath us.
    #[error("Session closed")]
    SessionClosed,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The driver does not offer this capability.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::SessionClosed | CdpError::WebSocket(_) => DriverError::SessionClosed,
            CdpError::ConnectionFailed(msg) | CdpError::ChromeNotAvailable(msg) => {
                DriverError::Connection(msg)
            }
            CdpError::Timeout(msg) => DriverError::Timeout(msg),
            CdpError::JavaScript(msg) => DriverError::JavaScript(msg),
            CdpError::InvalidResponse(msg) => DriverError::InvalidResponse(msg),
            CdpError::Serialization(e) => DriverError::InvalidResponse(e.to_string()),
            _ => DriverError::Protocol(e.to_string()),
        }
    }
}

/// Errors surfaced by the snapshot engine and the tab tracker.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Reading the page structure failed mid-build.
    #[error("Failed to collect page structure: {0}")]
    Collection(String),

    /// An index or element is no longer resolvable on the live page.
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Navigation to non-allowed URL: {0}")]
    UrlNotAllowed(String),

    #[error("No tab found with page_id: {0}")]
    NoSuchTab(i64),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The underlying browser session is gone.
    #[error("Browser session lost: {0}")]
    SessionLost(String),

    #[error("Browser connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Driver error: {0}")]
    Driver(DriverError),
}

impl BrowserError {
    /// Whether the error means the session must be re-initialized.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_))
    }
}

impl From<DriverError> for BrowserError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::SessionClosed => BrowserError::SessionLost(e.to_string()),
            DriverError::Timeout(msg) => BrowserError::Timeout(msg),
            DriverError::Connection(msg) => BrowserError::ConnectionFailed(msg),
            other => BrowserError::Driver(other),
        }
    }
}

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        DriverError::from(e).into()
    }
}
