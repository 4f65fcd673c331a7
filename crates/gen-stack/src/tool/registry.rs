//! Name-indexed tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{ExecutableToolRegistry, ToolError, ToolFuture, ToolHandler};
use crate::provider::ToolDefinition;

/// A registry of tool handlers, indexed by name.
///
/// With the `schema` feature, arguments are validated against the tool's
/// parameter schema before the handler runs. Cloning is cheap: handlers
/// are shared through `Arc`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any with the same name.
    pub fn register(&mut self, handler: impl ToolHandler + 'static) -> &mut Self {
        self.register_shared(Arc::new(handler))
    }

    /// Registers a shared handler, replacing any with the same name.
    pub fn register_shared(&mut self, handler: Arc<dyn ToolHandler>) -> &mut Self {
        let name = handler.definition().name;
        self.handlers.insert(name, handler);
        self
    }

    /// Returns the handler for `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    /// Returns whether a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Definitions of all registered tools, sorted by name.
    ///
    /// Pass these as the request's `tools` so the model knows what it can
    /// call.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.handlers.values().map(|h| h.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Looks up, validates and runs one tool.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_owned()))?;

        #[cfg(feature = "schema")]
        handler
            .definition()
            .parameters
            .validate(&arguments)
            .map_err(|message| ToolError::InvalidArguments {
                tool: name.to_owned(),
                message,
            })?;

        handler.execute(arguments).await
    }
}

impl ExecutableToolRegistry for ToolRegistry {
    fn execute<'a>(&'a self, name: &'a str, arguments: Value) -> ToolFuture<'a> {
        Box::pin(self.call(name, arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::tool_fn;
    use serde_json::json;

    fn add_tool() -> impl ToolHandler {
        tool_fn(
            ToolDefinition::new(
                "add",
                "Add two numbers",
                json!({
                    "type": "object",
                    "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                    "required": ["a", "b"]
                }),
            ),
            |input: Value| async move {
                let a = input["a"].as_f64().unwrap_or(0.0);
                let b = input["b"].as_f64().unwrap_or(0.0);
                Ok(json!(a + b))
            },
        )
    }

    #[tokio::test]
    async fn test_call_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool());
        let out = registry.call("add", json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(out, json!(5.0));
    }

    #[tokio::test]
    async fn test_unknown_tool_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.execute("weather", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("weather".into()));
        assert!(err.to_string().contains("not found"));
    }

    #[cfg(feature = "schema")]
    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool());
        let err = registry.call("add", json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "add"));
    }

    #[test]
    fn test_register_replaces_and_lists_sorted() {
        let mut registry = ToolRegistry::new();
        registry
            .register(add_tool())
            .register(add_tool())
            .register(tool_fn(
                ToolDefinition::new("abs", "Absolute value", json!({"type": "object"})),
                |input: Value| async move { Ok(input) },
            ));
        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["abs", "add"]);
        assert!(registry.get("add").is_some());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_clone_shares_handlers() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool());
        let cloned = registry.clone();
        assert!(Arc::ptr_eq(
            registry.get("add").unwrap(),
            cloned.get("add").unwrap()
        ));
    }
}
