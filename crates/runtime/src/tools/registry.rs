//! Name → handler bindings advertised to the model.

use indexmap::IndexMap;

use super::{ToolDescriptor, ToolError, ToolHandler};

#[derive(Debug, Clone)]
struct Binding {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Ordered set of tools, unique by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    bindings: IndexMap<String, Binding>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any earlier binding with the same name.
    ///
    /// A replaced tool keeps its original position. Returns the previous
    /// handler, if there was one.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: impl Into<ToolHandler>,
    ) -> Option<ToolHandler> {
        let name = descriptor.name.clone();
        let binding = Binding {
            descriptor,
            handler: handler.into(),
        };
        self.bindings
            .insert(name, binding)
            .map(|previous| previous.handler)
    }

    /// Descriptors in registration order.
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.bindings
            .values()
            .map(|binding| binding.descriptor.clone())
            .collect()
    }

    /// Look up the handler bound to `name`.
    pub fn resolve(&self, name: &str) -> Result<&ToolHandler, ToolError> {
        self.bindings
            .get(name)
            .map(|binding| &binding.handler)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
