//! Tool registry, handlers and invocation.

pub mod errors;
mod handler;
mod invoker;
mod registry;
mod types;

pub use errors::ToolError;
pub use handler::{LocalHandler, LocalTool, RemoteHandler, ToolFuture, ToolHandler};
pub use invoker::{invoke, normalize};
pub use registry::ToolRegistry;
pub use types::{Arguments, EMPTY_RESULT_MESSAGE, LIST_DELIMITER, ToolDescriptor, ToolResult};
