//! DOM operations for CDP page session.
//!
//! Node handles handed out of this module are backend node IDs, which stay
//! valid across `DOM.getDocument` calls.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{BoxModel, DomNode, RemoteObject};

use super::core::PageSession;

impl PageSession {
    /// Get document root node.
    pub async fn get_document(&self) -> Result<DomNode, CdpError> {
        let result = self
            .call(
                "DOM.getDocument",
                Some(json!({"depth": -1, "pierce": true})),
            )
            .await?;

        let root: DomNode = serde_json::from_value(result["root"].clone())?;
        Ok(root)
    }

    /// Content document of the single iframe matching `selector` under `scope`.
    ///
    /// `scope` is the backend ID of a document, `None` for the top document.
    pub async fn frame_document(
        &self,
        scope: Option<i64>,
        selector: &str,
    ) -> Result<Option<i64>, CdpError> {
        let doc = self.get_document().await?;
        let root = Self::scope_node_id(&doc, scope)?;
        let matches = self.query_node_ids(root, selector).await?;

        if matches.len() != 1 {
            return Ok(None);
        }

        Ok(doc
            .find(|n| n.node_id == matches[0])
            .and_then(|frame| frame.content_document.as_deref())
            .map(|content| content.backend_node_id))
    }

    /// Query selector all, scoped to a document.
    pub async fn query_selector_all(
        &self,
        scope: Option<i64>,
        selector: &str,
    ) -> Result<Vec<i64>, CdpError> {
        let doc = self.get_document().await?;
        let root = Self::scope_node_id(&doc, scope)?;
        let node_ids = self.query_node_ids(root, selector).await?;

        Ok(node_ids
            .into_iter()
            .filter_map(|id| doc.find(|n| n.node_id == id).map(|n| n.backend_node_id))
            .collect())
    }

    /// First node matching `xpath`, evaluated against a document.
    pub async fn query_xpath(
        &self,
        scope: Option<i64>,
        xpath: &str,
    ) -> Result<Option<i64>, CdpError> {
        const FIND: &str = "function(xpath) { \
            const doc = this.nodeType === 9 ? this : this.ownerDocument; \
            return doc.evaluate(xpath, doc, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null) \
                .singleNodeValue; }";

        let object_id = match scope {
            Some(backend_id) => self.resolve_node(backend_id).await?.object_id,
            None => self.document_handle().await?.object_id,
        }
        .ok_or_else(|| CdpError::InvalidResponse("Document has no object id".to_string()))?;

        let found = self.call_on(&object_id, FIND, &[json!(xpath)], false).await?;
        let Some(found_id) = found["objectId"].as_str() else {
            return Ok(None);
        };

        let described = self
            .call("DOM.describeNode", Some(json!({"objectId": found_id})))
            .await?;
        Ok(described["node"]["backendNodeId"].as_i64())
    }

    /// Get box model for node.
    pub async fn get_box_model(&self, backend_node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call(
                "DOM.getBoxModel",
                Some(json!({"backendNodeId": backend_node_id})),
            )
            .await;

        match result {
            Ok(r) => {
                let model: BoxModel = serde_json::from_value(r["model"].clone())?;
                Ok(Some(model))
            }
            Err(CdpError::Protocol { code: -32000, .. }) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve node to runtime object.
    pub async fn resolve_node(&self, backend_node_id: i64) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "DOM.resolveNode",
                Some(json!({"backendNodeId": backend_node_id})),
            )
            .await?;

        let obj: RemoteObject = serde_json::from_value(result["object"].clone())?;
        Ok(obj)
    }

    /// Scroll the node into view and click its centre.
    pub async fn click_node(&self, backend_node_id: i64) -> Result<(), CdpError> {
        self.call(
            "DOM.scrollIntoViewIfNeeded",
            Some(json!({"backendNodeId": backend_node_id})),
        )
        .await?;

        let box_model = self
            .get_box_model(backend_node_id)
            .await?
            .ok_or_else(|| CdpError::NodeNotFound(format!("node {} (not visible)", backend_node_id)))?;

        let (x, y) = Self::quad_center(&box_model.content);
        for kind in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": kind,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        debug!("Clicked node {} at ({}, {})", backend_node_id, x, y);
        Ok(())
    }

    /// Read the `value` property of a form control.
    pub async fn node_value(&self, backend_node_id: i64) -> Result<String, CdpError> {
        let object_id = self.node_object_id(backend_node_id).await?;
        let value = self
            .call_on(&object_id, "function() { return this.value ?? ''; }", &[], true)
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    /// Replace the value of a form control and fire `input`/`change`.
    pub async fn set_node_value(&self, backend_node_id: i64, value: &str) -> Result<(), CdpError> {
        const FILL: &str = "function(v) { \
            this.focus(); this.value = v; \
            this.dispatchEvent(new Event('input', {bubbles: true})); \
            this.dispatchEvent(new Event('change', {bubbles: true})); }";

        let object_id = self.node_object_id(backend_node_id).await?;
        self.call_on(&object_id, FILL, &[json!(value)], true).await?;
        Ok(())
    }

    /// Poll until the node has a rendered, non-empty box.
    pub async fn wait_for_node_visible(
        &self,
        backend_node_id: i64,
        timeout: Duration,
    ) -> Result<(), CdpError> {
        let start = std::time::Instant::now();

        loop {
            if let Some(model) = self.get_box_model(backend_node_id).await? {
                if model.width > 0 && model.height > 0 {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(format!(
                    "Node {} not visible after {:?}",
                    backend_node_id, timeout
                )));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Calculate center point of a quad.
    pub(super) fn quad_center(quad: &[f64]) -> (f64, f64) {
        if quad.len() >= 8 {
            let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
            let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
            (x, y)
        } else {
            (0.0, 0.0)
        }
    }

    async fn node_object_id(&self, backend_node_id: i64) -> Result<String, CdpError> {
        self.resolve_node(backend_node_id)
            .await?
            .object_id
            .ok_or_else(|| CdpError::NodeNotFound(format!("node {}", backend_node_id)))
    }

    async fn query_node_ids(&self, root: i64, selector: &str) -> Result<Vec<i64>, CdpError> {
        let result = self
            .call(
                "DOM.querySelectorAll",
                Some(json!({
                    "nodeId": root,
                    "selector": selector,
                })),
            )
            .await?;

        Ok(result["nodeIds"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default())
    }

    /// Map a scope to a node ID of the freshly fetched document.
    fn scope_node_id(doc: &DomNode, scope: Option<i64>) -> Result<i64, CdpError> {
        match scope {
            None => Ok(doc.node_id),
            Some(backend_id) => doc
                .find(|n| n.backend_node_id == backend_id)
                .map(|n| n.node_id)
                .ok_or_else(|| CdpError::NodeNotFound(format!("frame document {}", backend_id))),
        }
    }
}
