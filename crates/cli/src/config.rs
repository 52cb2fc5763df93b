//! Configuration loading from toolchat.toml.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use mcp::{DEFAULT_TIMEOUT, ServerConfig};
use research::{DEFAULT_MAX_RESULTS, ResearchConfig};
use runtime::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::Deserialize;

/// Environment variables consulted, in order, when no key is configured.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// External tool host. When present, its tools replace the local ones.
    pub tool_host: Option<ToolHostConfig>,

    /// Local arXiv tools.
    #[serde(default)]
    pub research: ResearchSection,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_model")]
    pub model: String,

    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// How to launch the tool host.
#[derive(Debug, Deserialize)]
pub struct ToolHostConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl ToolHostConfig {
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(&self.command, &self.args);
        config.env = self.env.clone();
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }
}

/// `[research]` section.
#[derive(Debug, Deserialize)]
pub struct ResearchSection {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Override for the arXiv query endpoint.
    pub api_url: Option<String>,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            api_url: None,
        }
    }
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl From<&ResearchSection> for ResearchConfig {
    fn from(section: &ResearchSection) -> Self {
        Self {
            max_results: section.max_results.max(1),
            api_url: section.api_url.clone(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(host) = &config.tool_host
            && host.command.trim().is_empty()
        {
            return Err(ConfigError::Invalid("tool_host.command is empty".into()));
        }
        Ok(config)
    }

    /// The configured key, else the first non-empty key variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.backend
            .api_key
            .clone()
            .into_iter()
            .chain(API_KEY_VARS.iter().filter_map(|name| lookup(name)))
            .find(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.model, DEFAULT_MODEL);
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert!(config.tool_host.is_none());
        assert_eq!(config.research.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn tool_host_section() {
        let config = Config::parse(
            r#"
            [backend]
            model = "gemini-2.0-flash"

            [tool_host]
            command = "uv"
            args = ["run", "research_server.py"]
            env = { PAPER_DIR = "papers" }
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.model, "gemini-2.0-flash");

        let server = config.tool_host.unwrap().server_config();
        assert_eq!(server.command, "uv");
        assert_eq!(server.args, vec!["run", "research_server.py"]);
        assert_eq!(server.env.get("PAPER_DIR").map(String::as_str), Some("papers"));
        assert_eq!(server.timeout, Duration::from_secs(3));
    }

    #[test]
    fn empty_command_is_invalid() {
        let err = Config::parse("[tool_host]\ncommand = \" \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(matches!(Config::parse("[policy]\nallow = []"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn api_key_resolution_order() {
        let env = |name: &str| match name {
            "GEMINI_API_KEY" => Some(String::new()),
            "API_KEY" => Some("from-env".to_string()),
            _ => None,
        };

        let config = Config::default();
        assert_eq!(config.api_key_with(env).as_deref(), Some("from-env"));
        assert_eq!(config.api_key_with(|_| None), None);

        let config = Config::parse("[backend]\napi_key = \"from-file\"").unwrap();
        assert_eq!(config.api_key_with(env).as_deref(), Some("from-file"));
    }

    #[test]
    fn research_section_feeds_tool_config() {
        let config = Config::parse("[research]\nmax_results = 0").unwrap();
        let research = ResearchConfig::from(&config.research);
        assert_eq!(research.max_results, 1);
        assert!(research.api_url.is_none());
    }
}
