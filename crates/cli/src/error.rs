//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be read or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No API key in the config file or the environment.
    #[error("no API key: set backend.api_key in {config} or GEMINI_API_KEY")]
    MissingApiKey { config: String },

    /// Arguments given to `call` are not a JSON object.
    #[error("tool arguments must be a JSON object: {0}")]
    Arguments(String),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// A tool could not be registered or invoked.
    #[error(transparent)]
    Tool(#[from] runtime::ToolError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
