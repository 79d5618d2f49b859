//! BrowserContext element re-location across frames.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::dom::ElementRef;
use crate::dom::selector::selector_for;
use crate::driver::{FrameScope, NodeRef, PageRef};
use crate::error::{BrowserError, DriverError};

use super::BrowserContext;

/// A snapshot element resolved onto the live page.
#[derive(Clone)]
pub struct ElementHandle {
    page: PageRef,
    node: NodeRef,
    xpath: String,
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("page", &self.page.id())
            .field("node", &self.node)
            .field("xpath", &self.xpath)
            .finish()
    }
}

impl ElementHandle {
    pub fn node(&self) -> NodeRef {
        self.node
    }

    pub fn xpath(&self) -> &str {
        &self.xpath
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub async fn click(&self) -> Result<(), BrowserError> {
        Ok(self.page.click(self.node).await?)
    }

    /// Replace the element's value and check it took.
    pub async fn fill(&self, text: &str) -> Result<(), BrowserError> {
        self.page.set_input_value(self.node, text).await?;

        let value = self.page.input_value(self.node).await?;
        if value != text {
            return Err(BrowserError::Driver(DriverError::InvalidResponse(format!(
                "Input value does not match: {}",
                self.xpath
            ))));
        }
        Ok(())
    }

    pub async fn input_value(&self) -> Result<String, BrowserError> {
        Ok(self.page.input_value(self.node).await?)
    }

    pub async fn wait_for_visible(&self, timeout: Duration) -> Result<(), BrowserError> {
        Ok(self.page.wait_for_visible(self.node, timeout).await?)
    }
}

impl BrowserContext {
    /// Find `element` on the current page, descending through its frames.
    ///
    /// Each frame ancestor is resolved by selector in its parent document. When
    /// the element's own selector is ambiguous the element's xpath decides.
    /// Never resolves to a different element: anything unresolvable is
    /// [`BrowserError::NotFound`].
    pub async fn get_locate_element(
        &mut self,
        element: &ElementRef,
    ) -> Result<ElementHandle, BrowserError> {
        let page = self.get_current_page().await?;
        let include_dynamic = self.config.include_dynamic_attributes;
        let not_found = || BrowserError::NotFound(element.xpath().to_string());

        let tree = element.tree();
        let mut scope = FrameScope::Top;
        for ancestor in element.ancestors_from_root() {
            let Some(frame) = tree.element(ancestor).filter(|el| el.is_frame()) else {
                continue;
            };
            let selector = selector_for(frame, include_dynamic);
            scope = page
                .resolve_frame(scope, &selector)
                .await?
                .ok_or_else(not_found)?;
        }

        let selector = selector_for(element.data(), include_dynamic);
        let matches = page.query_selector_all(scope, &selector).await?;
        let node = match matches.as_slice() {
            [] => return Err(not_found()),
            [node] => *node,
            _ => {
                debug!(
                    "Selector {} matched {} elements, using xpath",
                    selector,
                    matches.len()
                );
                page.query_xpath(scope, element.xpath())
                    .await?
                    .ok_or_else(not_found)?
            }
        };

        Ok(ElementHandle {
            page,
            node,
            xpath: element.xpath().to_string(),
        })
    }

    /// Whether `element` or an element descendant within `max_depth` levels
    /// is a file input.
    pub fn is_file_uploader(element: &ElementRef, max_depth: usize) -> bool {
        let tree = element.tree();
        let mut stack = vec![(element.id(), 0usize)];

        while let Some((id, depth)) = stack.pop() {
            let Some(el) = tree.element(id) else {
                continue;
            };
            if el.tag_name == "input"
                && (el.attribute("type") == Some("file")
                    || el.attribute("accept").is_some_and(|a| !a.is_empty()))
            {
                return true;
            }
            if depth < max_depth {
                stack.extend(el.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        false
    }
}
