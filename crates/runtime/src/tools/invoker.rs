//! Dispatch a function call and turn whatever the tool did into text.

use serde_json::Value;
use tracing::{info, warn};

use super::{ToolError, ToolRegistry, ToolResult};
use crate::model::FunctionCallIntent;

/// Resolve, call and normalize.
///
/// Unknown tools and channel faults are returned as errors; everything the
/// tool itself reports ends up in the `Text` result.
pub async fn invoke(
    intent: &FunctionCallIntent,
    registry: &ToolRegistry,
) -> Result<ToolResult, ToolError> {
    let handler = registry.resolve(&intent.name)?;
    info!(
        tool = %intent.name,
        remote = handler.is_remote(),
        arguments = intent.arguments.len(),
        "invoking tool"
    );

    let outcome = handler.call(intent.arguments.clone()).await;
    normalize(&intent.name, outcome)
}

/// Map a raw handler outcome onto exactly one `Text` result.
pub fn normalize(
    tool: &str,
    outcome: Result<Value, ToolError>,
) -> Result<ToolResult, ToolError> {
    match outcome {
        Ok(value) => Ok(ToolResult::from_value(value).into_text()),
        Err(error) if error.is_tool_side() => {
            warn!(%tool, %error, "tool reported failure");
            Ok(ToolResult::Text(format!("Error executing {tool}: {error}")))
        }
        Err(error) => Err(error),
    }
}
