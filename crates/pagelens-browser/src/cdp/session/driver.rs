//! [`PageDriver`] implementation over a CDP page session.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::driver::{FrameScope, NodeRef, PageDriver};
use crate::error::DriverError;

use super::core::PageSession;

fn scope_id(scope: FrameScope) -> Option<i64> {
    match scope {
        FrameScope::Top => None,
        FrameScope::Frame(id) => Some(id),
    }
}

#[async_trait]
impl PageDriver for PageSession {
    fn id(&self) -> &str {
        self.target_id()
    }

    fn is_closed(&self) -> bool {
        self.closed()
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok(self.current_url().await?)
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.current_title().await?)
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        Ok(PageSession::navigate(self, url, timeout).await?)
    }

    async fn go_back(&self, timeout: Duration) -> Result<(), DriverError> {
        Ok(PageSession::go_back(self, timeout).await?)
    }

    async fn reload(&self, timeout: Duration) -> Result<(), DriverError> {
        Ok(PageSession::reload(self, timeout).await?)
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), DriverError> {
        Ok(self.settle(timeout).await?)
    }

    async fn bring_to_front(&self) -> Result<(), DriverError> {
        Ok(PageSession::bring_to_front(self).await?)
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        Ok(PageSession::evaluate(self, expression).await?)
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        let data = self.capture_png(full_page).await?;
        STANDARD
            .decode(data)
            .map_err(|e| DriverError::InvalidResponse(format!("Screenshot data: {}", e)))
    }

    async fn resolve_frame(
        &self,
        scope: FrameScope,
        selector: &str,
    ) -> Result<Option<FrameScope>, DriverError> {
        let document = self.frame_document(scope_id(scope), selector).await?;
        Ok(document.map(FrameScope::Frame))
    }

    async fn query_selector_all(
        &self,
        scope: FrameScope,
        selector: &str,
    ) -> Result<Vec<NodeRef>, DriverError> {
        let nodes = PageSession::query_selector_all(self, scope_id(scope), selector).await?;
        Ok(nodes.into_iter().map(NodeRef).collect())
    }

    async fn query_xpath(
        &self,
        scope: FrameScope,
        xpath: &str,
    ) -> Result<Option<NodeRef>, DriverError> {
        let node = PageSession::query_xpath(self, scope_id(scope), xpath).await?;
        Ok(node.map(NodeRef))
    }

    async fn click(&self, node: NodeRef) -> Result<(), DriverError> {
        Ok(self.click_node(node.0).await?)
    }

    async fn input_value(&self, node: NodeRef) -> Result<String, DriverError> {
        Ok(self.node_value(node.0).await?)
    }

    async fn set_input_value(&self, node: NodeRef, value: &str) -> Result<(), DriverError> {
        Ok(self.set_node_value(node.0, value).await?)
    }

    async fn wait_for_visible(&self, node: NodeRef, timeout: Duration) -> Result<(), DriverError> {
        Ok(self.wait_for_node_visible(node.0, timeout).await?)
    }
}
