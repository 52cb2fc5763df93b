//! MCP (Model Context Protocol) client library.
//!
//! This crate talks to a tool host over newline-delimited JSON-RPC 2.0,
//! usually the standard streams of a spawned process.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Server, ServerConfig};
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig::new("uv", ["run", "research_server.py"]);
//!
//! let server = Server::spawn(config).await?;
//! server.initialize().await?;
//!
//! for tool in server.tools().await {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let mut args = serde_json::Map::new();
//! args.insert("topic".into(), "chemistry".into());
//! let result = server.call_tool("search_papers", Some(args)).await?;
//! println!("{:?}", result.first_text());
//!
//! server.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, Implementation, Incoming, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    PROTOCOL_VERSION, RequestId, ServerCapabilities, Tool, ToolContent,
};
pub use server::{DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE, Server, ServerConfig};
