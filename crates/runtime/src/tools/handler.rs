//! Tool handlers: in-process functions and tool-host proxies.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcp::Server;
use serde_json::Value;
use tracing::debug;

use super::{Arguments, ToolError};

/// Boxed future returned by [`LocalTool::call`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;

/// A tool implemented in this process.
///
/// `Ok(Value::Null)` means the tool ran but produced nothing.
pub trait LocalTool: Send + Sync {
    fn call(&self, arguments: Arguments) -> ToolFuture<'_>;
}

/// Adapter turning a synchronous closure into a [`LocalTool`].
struct FnTool<F>(F);

impl<F> LocalTool for FnTool<F>
where
    F: Fn(Arguments) -> Result<Value, ToolError> + Send + Sync,
{
    fn call(&self, arguments: Arguments) -> ToolFuture<'_> {
        let outcome = (self.0)(arguments);
        Box::pin(async move { outcome })
    }
}

/// Shared handle to a [`LocalTool`].
#[derive(Clone)]
pub struct LocalHandler(Arc<dyn LocalTool>);

impl LocalHandler {
    pub fn new(tool: impl LocalTool + 'static) -> Self {
        Self(Arc::new(tool))
    }

    /// Wrap a synchronous function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self::new(FnTool(f))
    }

    pub async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        self.0.call(arguments).await
    }
}

/// Proxy for a tool living in a tool host.
#[derive(Clone)]
pub struct RemoteHandler {
    server: Arc<Server>,
    tool_name: String,
}

impl RemoteHandler {
    pub fn new(server: Arc<Server>, tool_name: impl Into<String>) -> Self {
        Self {
            server,
            tool_name: tool_name.into(),
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Forward the call and return the first content part's text.
    pub async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        debug!(server = %self.server.name(), tool = %self.tool_name, "forwarding tool call");
        let result = self
            .server
            .call_tool(&self.tool_name, Some(arguments))
            .await?;

        Ok(result
            .first_text()
            .map_or(Value::Null, |text| Value::String(text.to_string())))
    }
}

/// Anything the registry can dispatch a call to.
#[derive(Clone)]
pub enum ToolHandler {
    Local(LocalHandler),
    Remote(RemoteHandler),
}

impl ToolHandler {
    pub async fn call(&self, arguments: Arguments) -> Result<Value, ToolError> {
        match self {
            Self::Local(handler) => handler.call(arguments).await,
            Self::Remote(handler) => handler.call(arguments).await,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<LocalHandler> for ToolHandler {
    fn from(handler: LocalHandler) -> Self {
        Self::Local(handler)
    }
}

impl From<RemoteHandler> for ToolHandler {
    fn from(handler: RemoteHandler) -> Self {
        Self::Remote(handler)
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.write_str("Local"),
            Self::Remote(handler) => write!(f, "Remote({})", handler.tool_name),
        }
    }
}
