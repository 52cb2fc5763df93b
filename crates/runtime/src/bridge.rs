//! Session bridge to an external tool host.

use std::sync::Arc;

use mcp::{Server, ServerConfig, Tool};
use serde_json::Value;
use tracing::{info, warn};

use crate::tools::{RemoteHandler, ToolDescriptor, ToolError, ToolRegistry};
use crate::{Error, Result};

/// Schema keys that mean nothing to the model.
const STRIPPED_SCHEMA_KEYS: [&str; 2] = ["additionalProperties", "$schema"];

/// One handshake-initialized connection to a tool host.
///
/// The tool list is captured once, at connection time.
pub struct SessionBridge {
    server: Arc<Server>,
    tools: Vec<Tool>,
}

impl SessionBridge {
    /// Spawn the tool host and run the handshake.
    pub async fn connect(config: ServerConfig) -> Result<Self> {
        let server = Server::spawn(config).await.map_err(Error::Channel)?;
        Self::attach(server).await
    }

    /// Run the handshake over an existing channel.
    ///
    /// On failure the channel is closed before the error is returned.
    pub async fn attach(server: Server) -> Result<Self> {
        let server = Arc::new(server);
        if let Err(e) = server.initialize().await {
            warn!(server = %server.name(), error = %e, "handshake failed");
            if let Err(close_err) = server.close().await {
                warn!(server = %server.name(), error = %close_err, "close after failed handshake");
            }
            return Err(Error::Channel(e));
        }

        let tools = server.tools().await;
        info!(
            server = %server.name(),
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "connected to tool host"
        );
        Ok(Self { server, tools })
    }

    pub fn name(&self) -> &str {
        self.server.name()
    }

    /// Tools advertised during the handshake.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Bind every advertised tool into `registry`; returns how many were bound.
    ///
    /// Tools whose schema is not an object are skipped.
    pub fn register_into(&self, registry: &mut ToolRegistry) -> usize {
        let mut bound = 0;
        for tool in &self.tools {
            match translate_tool(tool) {
                Ok(descriptor) => {
                    let handler = RemoteHandler::new(self.server.clone(), &tool.name);
                    registry.register(descriptor, handler);
                    bound += 1;
                }
                Err(e) => warn!(tool = %tool.name, error = %e, "skipping remote tool"),
            }
        }
        bound
    }

    /// Close the channel. Safe to call more than once.
    pub async fn close(&self) -> Result<bool> {
        self.server.close().await.map_err(Error::Channel)
    }

    pub fn is_closed(&self) -> bool {
        self.server.is_closed()
    }
}

/// Translate a host tool into a descriptor the model can consume.
pub fn translate_tool(tool: &Tool) -> std::result::Result<ToolDescriptor, ToolError> {
    let mut schema = tool.input_schema.clone();
    if let Value::Object(map) = &mut schema {
        for key in STRIPPED_SCHEMA_KEYS {
            map.remove(key);
        }
    }
    ToolDescriptor::new(
        &tool.name,
        tool.description.clone().unwrap_or_default(),
        schema,
    )
}
