//! Session and tab tracking.
//!
//! [`BrowserContext`] keeps one notion of "the current page" across tabs,
//! navigations and pages opened behind the agent's back, and produces the
//! per-step [`BrowserState`] snapshot.

mod context_core;
mod context_locate;
mod context_state;
mod context_tabs;
mod context_types;

pub use context_core::BrowserContext;
pub use context_locate::ElementHandle;
pub use context_types::{BrowserState, ContextState, TabInfo};

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
