//! Runtime evaluation for a page session.

use serde_json::{Value, json};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::RemoteObject;

use super::core::PageSession;

/// Fail with the exception text when the runtime reports one.
fn check_exception(result: &Value) -> Result<(), CdpError> {
    match result.get("exceptionDetails") {
        Some(details) => {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("Unknown error");
            Err(CdpError::JavaScript(text.to_string()))
        }
        None => Ok(()),
    }
}

impl PageSession {
    /// Evaluate an expression, awaiting promises, and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;
        check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    pub(super) async fn evaluate_string(&self, expression: &str) -> Result<String, CdpError> {
        Ok(self
            .evaluate(expression)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Handle to the top-level `document`.
    pub(super) async fn document_handle(&self) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({"expression": "document", "returnByValue": false})),
            )
            .await?;
        check_exception(&result)?;
        Ok(serde_json::from_value(result["result"].clone())?)
    }

    /// Call `function` with `this` bound to the object, passing `args` by value.
    ///
    /// With `by_value` the JSON result is returned; otherwise the result is
    /// left remote and its handle returned as a JSON object.
    pub(super) async fn call_on(
        &self,
        object_id: &str,
        function: &str,
        args: &[Value],
        by_value: bool,
    ) -> Result<Value, CdpError> {
        let arguments: Vec<Value> = args.iter().map(|v| json!({"value": v})).collect();
        let result = self
            .call(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": by_value,
                    "awaitPromise": true,
                })),
            )
            .await?;
        check_exception(&result)?;

        if by_value {
            Ok(result["result"]["value"].clone())
        } else {
            Ok(result["result"].clone())
        }
    }
}
