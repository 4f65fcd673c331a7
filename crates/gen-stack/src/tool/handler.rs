//! Tool handler trait and the closure-backed implementation.

use std::future::Future;

use serde_json::Value;

use super::{ToolError, ToolFuture};
use crate::provider::ToolDefinition;

/// A single tool that can be invoked by the model.
///
/// Implement this for tools with their own state. For simple tools, wrap
/// a closure with [`tool_fn`]. Object-safe, so handlers are stored as
/// `Arc<dyn ToolHandler>`.
pub trait ToolHandler: Send + Sync {
    /// The tool's name, description and parameter schema.
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool. The returned value becomes the call's result.
    fn execute(&self, input: Value) -> ToolFuture<'_>;
}

/// A tool handler backed by an async closure. Created by [`tool_fn`].
pub struct FnToolHandler<F> {
    definition: ToolDefinition,
    handler: F,
}

impl<F> std::fmt::Debug for FnToolHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnToolHandler")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, O> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<Value> + Send + 'static,
{
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn execute(&self, input: Value) -> ToolFuture<'_> {
        let fut = (self.handler)(input);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// Creates a [`ToolHandler`] from a closure.
///
/// The closure receives the parsed JSON arguments and returns anything
/// convertible to a [`Value`] (a `String`, a `json!` literal, ...).
pub fn tool_fn<F, Fut, O>(definition: ToolDefinition, handler: F) -> FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<Value> + Send + 'static,
{
    FnToolHandler {
        definition,
        handler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_tool_fn_executes() {
        let handler = tool_fn(
            ToolDefinition::new("echo", "Echo input", json!({"type": "object"})),
            |input: Value| async move { Ok(input) },
        );
        let out = handler.execute(json!({"x": 1})).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
        assert_eq!(handler.definition().name, "echo");
    }

    #[tokio::test]
    async fn test_tool_fn_string_output() {
        let handler = tool_fn(
            ToolDefinition::new("greet", "Greet", json!({"type": "object"})),
            |_input: Value| async move { Ok::<_, ToolError>("hello".to_string()) },
        );
        assert_eq!(handler.execute(json!({})).await.unwrap(), json!("hello"));
    }

    #[tokio::test]
    async fn test_tool_fn_error() {
        let handler = tool_fn(
            ToolDefinition::new("fail", "Always fails", json!({"type": "object"})),
            |_input: Value| async move { Err::<Value, _>(ToolError::failed("nope")) },
        );
        let err = handler.execute(json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::Failed("nope".into()));
    }

    #[test]
    fn test_debug_shows_name() {
        let handler = tool_fn(
            ToolDefinition::new("dbg", "d", json!({"type": "object"})),
            |input: Value| async move { Ok(input) },
        );
        assert!(format!("{handler:?}").contains("dbg"));
    }
}
