use thiserror::Error;

/// Errors that can occur while resolving or executing a tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid schema for tool {name}: {reason}")]
    InvalidSchema { name: String, reason: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("remote tool failed: {0}")]
    Remote(String),
    #[error("tool-host channel error: {0}")]
    Channel(String),
}

impl ToolError {
    /// Whether the failure came from the tool itself.
    ///
    /// Tool-side failures become part of the tool's result text; the rest
    /// are reported as errors of the turn.
    pub fn is_tool_side(&self) -> bool {
        matches!(
            self,
            Self::InvalidArguments(_) | Self::Execution(_) | Self::Remote(_)
        )
    }
}

impl From<mcp::Error> for ToolError {
    fn from(error: mcp::Error) -> Self {
        match error {
            mcp::Error::ToolCallFailed(message) => Self::Remote(message),
            mcp::Error::JsonRpc(error) => Self::Remote(error.to_string()),
            other => Self::Channel(other.to_string()),
        }
    }
}
