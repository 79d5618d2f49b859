//! DOM snapshot and element indexing.
//!
//! - [`TreeBuilder`] runs the collection script in a live page and turns its
//!   output into a [`DomTree`] plus a [`SelectorMap`] of interactive elements.
//! - [`ClickableElementProcessor`] hashes interactive elements so the next
//!   snapshot of the same URL can flag what is new.
//! - [`selector`] synthesizes CSS selectors for re-locating an element.

mod builder;
mod clickable;
mod node;
mod raw;
pub(crate) mod scripts;
pub mod selector;

pub use builder::{BuildOptions, DomState, TreeBuilder};
pub use clickable::{ClickableElementProcessor, ClickableHashSet, HashPolicy};
pub use node::{DomNode, DomTree, ElementData, ElementRef, NodeId, NodeKind, SelectorMap, TextData};
pub use selector::{convert_simple_xpath_to_css_selector, enhanced_css_selector_for_element};
