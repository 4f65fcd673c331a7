//! Executable Tool Registry.
//!
//! The generation loop resolves every function call the model makes
//! through an [`ExecutableToolRegistry`] injected into the
//! [`GenerationService`](crate::GenerationService). The core only
//! orchestrates; what a tool does is the application's business.
//!
//! ```text
//!   ToolHandler              one tool: definition + async execute
//!       │
//!   ToolRegistry             handlers by name, argument validation
//!       │
//!   ExecutableToolRegistry   what the generation loop calls
//! ```
//!
//! Failures never abort a generation. An unknown name or a failing tool
//! becomes a string result the model sees on its next turn.
//!
//! # Example
//!
//! ```rust
//! use gen_stack::tool::{tool_fn, ToolRegistry};
//! use gen_stack::ToolDefinition;
//! use serde_json::{json, Value};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(tool_fn(
//!     ToolDefinition::new(
//!         "add",
//!         "Add two numbers",
//!         json!({
//!             "type": "object",
//!             "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
//!             "required": ["a", "b"]
//!         }),
//!     ),
//!     |input: Value| async move {
//!         let a = input["a"].as_f64().unwrap_or(0.0);
//!         let b = input["b"].as_f64().unwrap_or(0.0);
//!         Ok(json!(a + b))
//!     },
//! ));
//! assert!(registry.contains("add"));
//! ```

mod error;
mod handler;
mod registry;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use error::ToolError;
pub use handler::{FnToolHandler, ToolHandler, tool_fn};
pub use registry::ToolRegistry;

/// Boxed future returned by tool execution.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;

/// Resolves and runs tools by name.
///
/// Object-safe so it can be injected as `Arc<dyn ExecutableToolRegistry>`.
/// Unknown names must fail with [`ToolError::NotFound`].
pub trait ExecutableToolRegistry: Send + Sync {
    /// Runs the tool `name` with already-parsed `arguments`.
    fn execute<'a>(&'a self, name: &'a str, arguments: Value) -> ToolFuture<'a>;
}
