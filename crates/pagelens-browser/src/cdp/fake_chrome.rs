//! Scripted DevTools endpoint for driving the client over real sockets.
//!
//! Serves `/json/version` over plain HTTP and answers every WebSocket
//! command from a fixed table. Received commands are recorded in order.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

type Received = Arc<Mutex<Vec<(String, Value)>>>;

pub(crate) struct FakeChrome {
    endpoint: String,
    received: Received,
    tasks: Vec<JoinHandle<()>>,
}

impl FakeChrome {
    /// Serve a browser holding `targets` as open pages.
    ///
    /// `document.readyState` always evaluates to `ready_state`.
    pub(crate) async fn start(targets: &[&str], ready_state: &str) -> Self {
        let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", http.local_addr().unwrap());
        let ws_url = format!("ws://{}/devtools/browser/fake", ws.local_addr().unwrap());

        let script = Arc::new(Script {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            ready_state: ready_state.to_string(),
        });
        let received: Received = Arc::new(Mutex::new(Vec::new()));

        let tasks = vec![
            tokio::spawn(serve_version(http, ws_url)),
            tokio::spawn(serve_commands(ws, script, received.clone())),
        ];
        Self {
            endpoint,
            received,
            tasks,
        }
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Params of every received `method` command, oldest first.
    pub(crate) fn calls(&self, method: &str) -> Vec<Value> {
        self.received
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

impl Drop for FakeChrome {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

struct Script {
    targets: Vec<String>,
    ready_state: String,
}

impl Script {
    fn reply(&self, method: &str, params: &Value) -> Value {
        match method {
            "Target.getTargets" => {
                let infos: Vec<Value> = self
                    .targets
                    .iter()
                    .map(|id| json!({"targetId": id, "type": "page", "title": "", "url": "about:blank"}))
                    .collect();
                json!({"targetInfos": infos})
            }
            "Target.createTarget" => json!({"targetId": "CREATED"}),
            "Target.attachToTarget" => {
                json!({"sessionId": format!("S-{}", params["targetId"].as_str().unwrap_or_default())})
            }
            "Page.navigate" => json!({"frameId": "F1", "loaderId": "L1"}),
            "Page.getNavigationHistory" => json!({
                "currentIndex": 1,
                "entries": [{"id": 1, "url": "about:blank"}, {"id": 2, "url": "https://example.com/"}]
            }),
            "Runtime.evaluate" if params["expression"] == "document.readyState" => {
                json!({"result": {"type": "string", "value": self.ready_state}})
            }
            _ => json!({}),
        }
    }
}

async fn serve_version(listener: TcpListener, ws_url: String) {
    let body = json!({
        "Browser": "HeadlessChrome/126.0.6478.61",
        "Protocol-Version": "1.3",
        "User-Agent": "Mozilla/5.0",
        "webSocketDebuggerUrl": ws_url,
    })
    .to_string();

    while let Ok((mut stream, _)) = listener.accept().await {
        let mut request = [0u8; 2048];
        let _ = stream.read(&mut request).await;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

async fn serve_commands(listener: TcpListener, script: Arc<Script>, received: Received) {
    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(answer(stream, script.clone(), received.clone()));
    }
}

async fn answer(stream: TcpStream, script: Arc<Script>, received: Received) {
    let Ok(socket) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = socket.split();

    while let Some(Ok(frame)) = source.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        let mut reply = json!({"id": request["id"], "result": script.reply(&method, &params)});
        if let Some(session_id) = request.get("sessionId") {
            reply["sessionId"] = session_id.clone();
        }
        received.lock().push((method, params));

        if sink.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
}
