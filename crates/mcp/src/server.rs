//! Tool-host connection management (spawn, communicate, lifecycle).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, Incoming, InitializeParams, InitializeResult,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, Tool,
};

/// Default timeout for a single request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum size of one message line (1MB).
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Newline-delimited reader that survives cancellation.
///
/// Bytes of a line that is still arriving when a read is dropped stay in
/// `pending`, so the next read completes that line instead of starting
/// mid-message.
struct LineReader {
    inner: BufReader<Box<dyn AsyncRead + Send + Unpin>>,
    pending: Vec<u8>,
}

impl LineReader {
    fn new(inner: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    /// Next complete line, or `None` at end of input.
    async fn next_line(&mut self) -> Result<Option<String>> {
        let read = self.inner.read_until(b'\n', &mut self.pending).await?;
        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let line = std::mem::take(&mut self.pending);
        if line.len() > MAX_OUTPUT_SIZE {
            return Err(Error::OutputTooLarge {
                size: line.len(),
                max: MAX_OUTPUT_SIZE,
            });
        }
        String::from_utf8(line)
            .map(Some)
            .map_err(|e| Error::InvalidResponse(format!("line is not UTF-8: {e}")))
    }
}

/// Configuration for a tool-host process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Duration,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let command = command.into();
        Self {
            name: command.clone(),
            command,
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Handle to a running tool host.
///
/// Requests are single-flight: a second caller waits until the first
/// exchange has received its response.
pub struct Server {
    name: String,
    timeout: Duration,
    process: Mutex<Option<Child>>,
    writer: Mutex<Writer>,
    reader: Mutex<LineReader>,
    in_flight: Mutex<()>,
    next_id: AtomicI64,
    initialized: AtomicBool,
    closed: AtomicBool,
    tools: Mutex<Vec<Tool>>,
}

impl Server {
    /// Spawn a tool-host process and talk to it over its standard streams.
    pub async fn spawn(config: ServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut process = cmd
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {e}", config.command)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn("failed to capture stdin".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn("failed to capture stdout".into()))?;

        info!(server = %config.name, command = %config.command, "spawned tool host");

        let mut server = Self::from_streams(config.name, stdout, stdin).with_timeout(config.timeout);
        server.process = Mutex::new(Some(process));
        Ok(server)
    }

    /// Wrap an existing duplex channel (no child process is owned).
    pub fn from_streams<R, W>(name: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let writer: Writer = Box::new(writer);
        Self {
            name: name.into(),
            timeout: DEFAULT_TIMEOUT,
            process: Mutex::new(None),
            writer: Mutex::new(writer),
            reader: Mutex::new(LineReader::new(reader)),
            in_flight: Mutex::new(()),
            next_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            tools: Mutex::new(Vec::new()),
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the initialize handshake and fetch the tool list once.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self
            .request("initialize", Some(InitializeParams::default()))
            .await?;

        self.notify("notifications/initialized").await?;

        debug!(
            server = %self.name,
            host = %result.server_info.name,
            protocol = %result.protocol_version,
            "handshake complete"
        );
        self.initialized.store(true, Ordering::SeqCst);

        self.refresh_tools().await?;
        Ok(result)
    }

    /// Check if the handshake has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Re-fetch the list of available tools.
    pub async fn refresh_tools(&self) -> Result<()> {
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        *self.tools.lock().await = result.tools;
        Ok(())
    }

    /// Tools captured by the last listing.
    pub async fn tools(&self) -> Vec<Tool> {
        self.tools.lock().await.clone()
    }

    /// Call a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result: CallToolResult = self.request("tools/call", Some(params)).await?;

        if result.is_error {
            return Err(Error::ToolCallFailed(result.joined_text()));
        }
        Ok(result)
    }

    /// Whether [`Server::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the channel and terminate the process.
    ///
    /// Only the first call does any work; it returns `true`. Later calls
    /// return `false`.
    pub async fn close(&self) -> Result<bool> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!(server = %self.name, error = %e, "writer already gone");
        }

        if let Some(mut process) = self.process.lock().await.take()
            && let Err(e) = process.kill().await
        {
            warn!(server = %self.name, error = %e, "failed to kill tool host");
        }

        info!(server = %self.name, "tool-host channel closed");
        Ok(true)
    }

    // --- Internal methods ---

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let _guard = self.in_flight.lock().await;

        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(p)?;
        }

        debug!(server = %self.name, %method, id = ?id, "sending request");
        self.write_line(&serde_json::to_string(&request)?).await?;

        let response = timeout(self.timeout, self.read_response(&id))
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let result_value = response.into_result()?;
        Ok(serde_json::from_value(result_value)?)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let notification = JsonRpcNotification::new(method);
        self.write_line(&serde_json::to_string(&notification)?).await
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_response(&self, id: &RequestId) -> Result<JsonRpcResponse> {
        let mut reader = self.reader.lock().await;
        loop {
            let Some(line) = reader.next_line().await? else {
                return Err(Error::ServerExited);
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match Incoming::parse(line)? {
                Incoming::Response(response) if &response.id == id => return Ok(response),
                // Late answer to a request that already timed out.
                Incoming::Response(JsonRpcResponse {
                    id: RequestId::Number(stale),
                    ..
                }) if matches!(id, RequestId::Number(current) if stale < *current) => {
                    debug!(server = %self.name, stale, "discarding stale response");
                }
                Incoming::Response(response) => {
                    return Err(Error::InvalidResponse(format!(
                        "response ID mismatch: expected {id:?}, got {:?}",
                        response.id
                    )));
                }
                Incoming::Other(method) => {
                    debug!(server = %self.name, %method, "skipping host message");
                }
            }
        }
    }
}
