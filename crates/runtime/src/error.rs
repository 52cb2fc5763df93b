use thiserror::Error;

use crate::model::GatewayError;
use crate::tools::ToolError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("tool-host channel: {0}")]
    Channel(#[source] mcp::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
