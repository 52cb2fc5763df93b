use super::errors::GatewayError;
use crate::tools::{Arguments, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallIntent {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl FunctionCallIntent {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The model's decision for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    FunctionCall(FunctionCallIntent),
    PlainText(String),
}

/// Trait for model services.
///
/// One request per query; the available tools are sent along with it.
pub trait ModelGateway: Send + Sync {
    fn interpret(
        &self,
        query: &str,
        tools: &[ToolDescriptor],
    ) -> impl Future<Output = Result<Intent, GatewayError>> + Send;
}
