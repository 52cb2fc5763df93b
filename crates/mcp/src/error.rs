//! MCP error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn tool host: {0}")]
    Spawn(String),

    #[error("I/O error on tool-host channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("tool host not initialized")]
    NotInitialized,

    #[error("tool-host channel is closed")]
    Closed,

    #[error("tool host exited unexpectedly")]
    ServerExited,

    #[error("timeout waiting for response after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcError),

    #[error("tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
