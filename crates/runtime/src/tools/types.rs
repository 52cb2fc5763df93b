//! Tool-related types.

use super::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named-argument bag passed to a tool.
pub type Arguments = Map<String, Value>;

/// Text shown when a tool succeeds without producing anything.
pub const EMPTY_RESULT_MESSAGE: &str = "The operation completed but didn't return any results.";

/// Separator used when a tool returns a list.
pub const LIST_DELIMITER: &str = ",";

/// A tool definition advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema of an object whose properties are the tool's parameters.
    pub parameter_schema: Value,
}

impl ToolDescriptor {
    /// Create a descriptor, checking that the schema describes an object.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: Value,
    ) -> Result<Self, ToolError> {
        let name = name.into();
        match parameter_schema.get("type").and_then(Value::as_str) {
            Some("object") => Ok(Self {
                name,
                description: description.into(),
                parameter_schema,
            }),
            other => Err(ToolError::InvalidSchema {
                reason: format!("expected type \"object\", found {other:?}"),
                name,
            }),
        }
    }

    /// Names listed under the schema's `required` key.
    pub fn required(&self) -> Vec<&str> {
        self.parameter_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// What a tool produced, ready to be shown or sent back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Text(String),
    Structured(Value),
    Empty,
}

impl ToolResult {
    /// Classify a raw handler value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }

    /// Collapse into the `Text` variant.
    pub fn into_text(self) -> Self {
        match self {
            Self::Text(_) => self,
            other => Self::Text(other.to_string()),
        }
    }

    /// Borrow the text, if this is the `Text` variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Empty => f.write_str(EMPTY_RESULT_MESSAGE),
            Self::Structured(Value::Array(items)) => {
                let joined = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(LIST_DELIMITER);
                f.write_str(&joined)
            }
            Self::Structured(value @ Value::Object(_)) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| std::fmt::Error)?;
                f.write_str(&pretty)
            }
            Self::Structured(other) => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_requires_object_schema() {
        let ok = ToolDescriptor::new("t", "d", json!({"type": "object", "required": ["a"]}));
        assert_eq!(ok.unwrap().required(), vec!["a"]);

        let err = ToolDescriptor::new("t", "d", json!({"type": "string"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSchema { ref name, .. } if name == "t"));

        assert!(ToolDescriptor::new("t", "d", json!({})).is_err());
    }

    #[test]
    fn classify_raw_values() {
        assert_eq!(ToolResult::from_value(Value::Null), ToolResult::Empty);
        assert_eq!(
            ToolResult::from_value(json!("hi")),
            ToolResult::Text("hi".into())
        );
        assert!(matches!(
            ToolResult::from_value(json!([1])),
            ToolResult::Structured(_)
        ));
    }

    #[test]
    fn render_list_mixes_strings_and_scalars() {
        let result = ToolResult::Structured(json!(["a", 2, true]));
        assert_eq!(result.into_text().as_text(), Some("a,2,true"));
    }

    #[test]
    fn render_object_keeps_key_order() {
        let result = ToolResult::Structured(json!({"zeta": 1, "alpha": "x"}));
        assert_eq!(result.to_string(), "{\n  \"zeta\": 1,\n  \"alpha\": \"x\"\n}");
    }
}
