//! The application's stored message representation.
//!
//! These types are owned by the caller's persistence layer and consumed
//! read-only. [`generate_context`](crate::context::generate_context)
//! turns them into provider-facing [`ContextItem`](crate::ContextItem)s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message.
///
/// Roles written by newer or foreign producers deserialize as
/// [`Role::Unknown`] instead of failing, and are dropped when building
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Grounding instructions.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
    /// Anything else found in stored history.
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Wire name of the role. `None` for [`Role::Unknown`].
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::System => Some("system"),
            Self::User => Some("user"),
            Self::Assistant => Some("assistant"),
            Self::Unknown => None,
        }
    }
}

/// One stored message.
///
/// `tool_calls` is only meaningful when `role` is [`Role::Assistant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Raw message text.
    pub text: String,
    /// Tool invocations the assistant made in this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// A system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// A user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// An assistant message without tool calls.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// An assistant message that invoked tools.
    pub fn assistant_with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_calls: Some(tool_calls),
        }
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            tool_calls: None,
        }
    }
}

/// A tool invocation recorded on an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id shared by the call and its output.
    pub id: String,
    /// Which function was called and with what.
    pub function: FunctionCall,
    /// The tool's result, once produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolCall {
    /// A call that has not produced a result yet.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
            result: None,
        }
    }

    /// Attaches a result.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Function name and JSON-encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// The function's name.
    pub name: String,
    /// Arguments as a JSON string, exactly as the model produced them.
    pub arguments: String,
}
