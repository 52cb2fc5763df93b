//! In-memory tool host used by the unit tests.

use std::time::Duration;

use mcp::{Server, Tool};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex, split};
use tokio::task::JoinHandle;

type CallFn = Box<dyn Fn(&str, &Value) -> Result<Value, String> + Send + Sync>;

/// Scripted tool host speaking newline-delimited JSON-RPC.
pub(crate) struct FakeHost {
    tools: Vec<Tool>,
    on_call: Option<CallFn>,
    reject_initialize: bool,
    hang_on_call: bool,
}

/// Running fake host; resolves to the number of times it saw end of input.
pub(crate) struct FakeHostHandle(JoinHandle<usize>);

impl FakeHostHandle {
    pub(crate) async fn finish(self) -> usize {
        self.0.await.expect("fake host task panicked")
    }
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self {
            tools: Vec::new(),
            on_call: None,
            reject_initialize: false,
            hang_on_call: false,
        }
    }

    pub(crate) fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub(crate) fn on_call<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.on_call = Some(Box::new(f));
        self
    }

    pub(crate) fn reject_initialize(mut self) -> Self {
        self.reject_initialize = true;
        self
    }

    pub(crate) fn hang_on_call(mut self) -> Self {
        self.hang_on_call = true;
        self
    }

    pub(crate) fn start(self) -> (Server, FakeHostHandle) {
        let (client, host) = duplex(64 * 1024);
        let (client_read, client_write) = split(client);
        let (host_read, mut host_write) = split(host);

        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(host_read).lines();
            let mut eof = 0;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        eof += 1;
                        break;
                    }
                };
                let message: Value = serde_json::from_str(&line).expect("client sent JSON");
                let Some(id) = message.get("id").cloned() else {
                    continue;
                };
                let outcome = match message["method"].as_str().unwrap_or_default() {
                    "initialize" if self.reject_initialize => Err("initialize refused".to_string()),
                    "initialize" => Ok(json!({
                        "protocolVersion": mcp::PROTOCOL_VERSION,
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": "fake", "version": "0.0.1"}
                    })),
                    "tools/list" => Ok(json!({ "tools": self.tools })),
                    "tools/call" if self.hang_on_call => continue,
                    "tools/call" => {
                        let params = &message["params"];
                        let name = params["name"].as_str().unwrap_or_default();
                        match &self.on_call {
                            Some(f) => f(name, &params["arguments"]),
                            None => Ok(json!({"content": []})),
                        }
                    }
                    other => Err(format!("method not found: {other}")),
                };
                let reply = match outcome {
                    Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                    Err(message) => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32000, "message": message}
                    }),
                };
                let mut text = reply.to_string();
                text.push('\n');
                if host_write.write_all(text.as_bytes()).await.is_err() {
                    break;
                }
            }
            eof
        });

        let server = Server::from_streams("fake", client_read, client_write)
            .with_timeout(Duration::from_millis(300));
        (server, FakeHostHandle(task))
    }
}
