//! Tool-calling runtime for toolchat.
//!
//! This crate lets a language model call tools and relays their results
//! back into an interactive conversation.
//!
//! # Overview
//!
//! - **ToolRegistry**: ordered name → handler bindings, advertised to the model.
//! - **ToolHandler**: either an in-process [`LocalTool`] or a proxy to a tool
//!   living in an external tool host.
//! - **invoke**: resolves a function call, runs it and normalizes the result
//!   into text.
//! - **ModelGateway**: turns a query plus tool descriptors into an [`Intent`].
//! - **SessionBridge**: one handshake-initialized connection to a tool host.
//! - **Session**: the read-query / dispatch / print loop.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{GeminiGateway, Session, ToolRegistry};
//!
//! # async fn example() -> runtime::Result<()> {
//! let gateway = GeminiGateway::builder(std::env::var("GEMINI_API_KEY").unwrap()).build();
//! let mut session = Session::new(gateway, ToolRegistry::new());
//!
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! session.run(stdin, &mut std::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

mod bridge;
mod error;
pub mod model;
mod providers;
mod session;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use bridge::{SessionBridge, translate_tool};
pub use error::{Error, Result};
pub use model::{FunctionCallIntent, GatewayError, Intent, ModelGateway};
pub use providers::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiGateway, GeminiGatewayBuilder};
pub use session::{Input, QUIT_COMMAND, Session, State};
pub use tools::{
    Arguments, EMPTY_RESULT_MESSAGE, LocalHandler, LocalTool, RemoteHandler, ToolDescriptor,
    ToolError, ToolFuture, ToolHandler, ToolRegistry, ToolResult, invoke,
};
