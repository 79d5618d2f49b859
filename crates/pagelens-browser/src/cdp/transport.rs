//! WebSocket transport shared by the browser client and its page sessions.
//!
//! One socket carries every command. Replies are matched to callers by request
//! id; events are fanned out by the `sessionId` they carry, with browser-level
//! events on the empty key.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{CdpRequest, CdpResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type Reply = Result<Value, CdpError>;

/// Routes inbound frames to waiting callers and event listeners.
#[derive(Default)]
pub(crate) struct Router {
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    listeners: Mutex<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>,
}

impl Router {
    fn expect(&self, id: u64) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        rx
    }

    fn forget(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    /// Start receiving events for `session_id`. Replaces an earlier listener.
    pub(crate) fn listen(&self, session_id: &str) -> mpsc::UnboundedReceiver<CdpResponse> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().insert(session_id.to_string(), tx);
        rx
    }

    /// Route one text frame.
    pub(crate) fn dispatch(&self, text: &str) {
        let message: CdpResponse = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to parse CDP message: {}", e);
                return;
            }
        };

        if let Some(id) = message.id {
            let Some(waiter) = self.pending.lock().remove(&id) else {
                trace!("Dropping reply {} with no waiter", id);
                return;
            };
            let reply = match message.error {
                Some(error) => Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(message.result.unwrap_or(Value::Null)),
            };
            let _ = waiter.send(reply);
            return;
        }

        if message.method.is_some() {
            let key = message.session_id.clone().unwrap_or_default();
            let mut listeners = self.listeners.lock();
            if let Some(tx) = listeners.get(&key) {
                if tx.send(message).is_err() {
                    listeners.remove(&key);
                }
            }
        }
    }

    /// Fail every waiter and close every listener.
    pub(crate) fn shutdown(&self) {
        self.pending.lock().clear();
        self.listeners.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        self.pending.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn listening(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Request side of the connection.
pub(crate) struct Transport {
    sink: tokio::sync::Mutex<WsSink>,
    router: Arc<Router>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl Transport {
    /// Open the socket and start routing inbound frames.
    pub(crate) async fn open(
        ws_url: &str,
        request_timeout: Duration,
    ) -> Result<(Arc<Self>, JoinHandle<()>), CdpError> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;
        let (sink, source) = stream.split();

        let router = Arc::new(Router::default());
        let pump = tokio::spawn(Self::pump(source, router.clone()));

        let transport = Arc::new(Self {
            sink: tokio::sync::Mutex::new(sink),
            router,
            next_id: AtomicU64::new(1),
            request_timeout,
        });
        Ok((transport, pump))
    }

    async fn pump(mut source: WsSource, router: Arc<Router>) {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    router.dispatch(&text);
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed by browser");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            }
        }
        router.shutdown();
    }

    pub(crate) fn router(&self) -> &Router {
        &self.router
    }

    /// Send a command, optionally scoped to a page session, and await its reply.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_string(&CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        })?;
        trace!("CDP send: {}", frame);

        let reply = self.router.expect(id);
        if let Err(e) = self.sink.lock().await.send(Message::Text(frame.into())).await {
            self.router.forget(id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.request_timeout, reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.router.forget(id);
                Err(CdpError::Timeout(format!("{} after {:?}", method, self.request_timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_reaches_waiter() {
        let router = Router::default();
        let mut rx = router.expect(7);

        router.dispatch(r#"{"id": 7, "result": {"frameId": "F1"}}"#);

        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(reply["frameId"], "F1");
        assert_eq!(router.waiting(), 0);
    }

    #[test]
    fn test_error_reply_is_protocol_error() {
        let router = Router::default();
        let mut rx = router.expect(3);

        router.dispatch(r#"{"id": 3, "error": {"code": -32000, "message": "No node"}}"#);

        match rx.try_recv().unwrap() {
            Err(CdpError::Protocol { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "No node");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_events_routed_by_session() {
        let router = Router::default();
        let mut browser = router.listen("");
        let mut page = router.listen("S1");

        router.dispatch(r#"{"method": "Target.targetCreated", "params": {}}"#);
        router.dispatch(r#"{"method": "Page.loadEventFired", "sessionId": "S1", "params": {}}"#);
        router.dispatch(r#"{"method": "Page.loadEventFired", "sessionId": "S2", "params": {}}"#);

        let event = browser.try_recv().unwrap();
        assert_eq!(event.method.as_deref(), Some("Target.targetCreated"));
        assert!(browser.try_recv().is_err());

        let event = page.try_recv().unwrap();
        assert_eq!(event.session_id.as_deref(), Some("S1"));
        assert!(page.try_recv().is_err());
    }

    #[test]
    fn test_unrouted_session_events_are_dropped() {
        let router = Router::default();
        let mut browser = router.listen("");

        router.dispatch(r#"{"method": "Runtime.consoleAPICalled", "sessionId": "S1"}"#);
        assert!(browser.try_recv().is_err());
        assert_eq!(router.listening(), 1);
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let router = Router::default();
        drop(router.listen("S1"));

        router.dispatch(r#"{"method": "Page.loadEventFired", "sessionId": "S1"}"#);
        assert_eq!(router.listening(), 0);
    }

    #[test]
    fn test_shutdown_fails_waiters() {
        let router = Router::default();
        let mut rx = router.expect(1);
        router.shutdown();
        assert!(rx.try_recv().is_err());
        assert_eq!(router.waiting(), 0);
    }

    #[test]
    fn test_garbage_and_unknown_ids_are_ignored() {
        let router = Router::default();
        let mut rx = router.expect(1);

        router.dispatch("not json");
        router.dispatch(r#"{"id": 99, "result": {}}"#);

        assert!(rx.try_recv().is_err());
        assert_eq!(router.waiting(), 1);
    }
}
