//! Conversation loop.

use std::io::Write;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::bridge::SessionBridge;
use crate::model::{Intent, ModelGateway};
use crate::tools::{ToolRegistry, invoke};
use crate::Result;

/// Typing this (any case, surrounding whitespace ignored) ends the session.
pub const QUIT_COMMAND: &str = "quit";

const PROMPT: &str = "\nQuery: ";

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    Empty,
    Query(String),
}

impl Input {
    /// Classify a line; `None` is end of input.
    pub fn parse(line: Option<&str>) -> Self {
        let Some(line) = line else {
            return Self::Quit;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if trimmed.eq_ignore_ascii_case(QUIT_COMMAND) {
            Self::Quit
        } else {
            Self::Query(trimmed.to_string())
        }
    }
}

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingQuery,
    Processing,
    Done,
}

/// An interactive session: one model gateway, one registry, at most one
/// tool-host connection.
pub struct Session<G> {
    gateway: G,
    registry: ToolRegistry,
    bridge: Option<SessionBridge>,
    state: State,
}

impl<G: ModelGateway> Session<G> {
    pub fn new(gateway: G, registry: ToolRegistry) -> Self {
        Self {
            gateway,
            registry,
            bridge: None,
            state: State::AwaitingQuery,
        }
    }

    /// Attach a tool-host connection and bind its tools.
    pub fn with_bridge(mut self, bridge: SessionBridge) -> Self {
        let bound = bridge.register_into(&mut self.registry);
        debug!(server = %bridge.name(), bound, "bound remote tools");
        self.bridge = Some(bridge);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn bridge(&self) -> Option<&SessionBridge> {
        self.bridge.as_ref()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Read queries from `input` until quit or end of input, then close.
    ///
    /// Per-turn failures are written to `output` and the loop carries on.
    /// The tool-host connection is closed on every exit path.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let outcome = self.drive(input, output).await;
        let closed = self.close().await;
        outcome.and(closed)
    }

    /// Close the tool-host connection, if any, and mark the session done.
    pub async fn close(&mut self) -> Result<()> {
        self.state = State::Done;
        if let Some(bridge) = &self.bridge {
            bridge.close().await?;
        }
        Ok(())
    }

    /// Handle one query, writing what happened to `output`.
    pub async fn process_query<W: Write>(&self, query: &str, output: &mut W) -> Result<()> {
        let tools = self.registry.describe_all();
        match self.gateway.interpret(query, &tools).await? {
            Intent::PlainText(text) => {
                debug!("model answered without a function call");
                writeln!(output, "{text}")?;
            }
            Intent::FunctionCall(call) => {
                writeln!(output, "Function to call: {}", call.name)?;
                writeln!(output, "Arguments: {}", Value::Object(call.arguments.clone()))?;
                let result = invoke(&call, &self.registry).await?;
                writeln!(output, "Result:\n{result}")?;
            }
        }
        Ok(())
    }

    async fn drive<R, W>(&mut self, mut input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut buf = Vec::new();
        writeln!(output, "Type your queries or '{QUIT_COMMAND}' to exit.")?;
        self.state = State::AwaitingQuery;

        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            // Bytes, not `lines()`: a line that is not UTF-8 must not end the session.
            buf.clear();
            let line = match input.read_until(b'\n', &mut buf).await? {
                0 => None,
                _ => Some(String::from_utf8_lossy(&buf)),
            };
            let query = match Input::parse(line.as_deref()) {
                Input::Quit => break,
                Input::Empty => continue,
                Input::Query(query) => query,
            };

            self.state = State::Processing;
            info!(chars = query.len(), "processing query");
            if let Err(e) = self.process_query(&query, output).await {
                warn!(error = %e, "turn failed");
                writeln!(output, "\nError: {e}")?;
            }
            self.state = State::AwaitingQuery;
        }

        info!("session finished");
        Ok(())
    }
}
