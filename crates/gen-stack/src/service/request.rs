//! Caller-facing request types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::message::{Message, Role};
use crate::provider::{ReasoningEffort, ToolDefinition};
use crate::usage::Credits;
use crate::world::World;

/// Everything one top-level generation needs.
///
/// Use struct-update syntax:
///
/// ```rust
/// use gen_stack::{GenerationRequest, Message};
///
/// let request = GenerationRequest {
///     model: Some("gpt-4o-mini".into()),
///     max_tokens: Some(512),
///     ..GenerationRequest::new(vec![Message::user("Hello")])
/// };
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    /// Model name hint, normalized by
    /// [`get_model`](crate::GenerationService::get_model).
    pub model: Option<String>,
    /// Chain on a stored provider response. Only the trailing user
    /// message of `input` is sent on the first turn.
    pub previous_response_id: Option<String>,
    /// Conversation history, oldest first.
    pub input: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
    /// Whether the model may emit several tool calls per turn.
    pub parallel_tool_calls: Option<bool>,
    /// Reasoning effort, ignored for models without reasoning support.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// End-user identity forwarded to the provider.
    pub user_data: UserData,
    /// Upper bound on output tokens per turn.
    pub max_tokens: Option<u64>,
    /// Credit ceiling for the whole generation.
    pub max_credits: Option<Credits>,
    /// Overrides the service's world for this request.
    pub world: Option<World>,
}

impl GenerationRequest {
    /// A request over `input` with every option at its default.
    pub fn new(input: Vec<Message>) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    /// Checks the request before any provider call is made.
    ///
    /// # Errors
    ///
    /// [`GenerationError::InvalidRequest`] when `input` is empty, or when
    /// `previous_response_id` is set but `input` has no user message.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.input.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "input must contain at least one message".into(),
            ));
        }
        if self.previous_response_id.is_some() && !self.input.iter().any(|m| m.role == Role::User)
        {
            return Err(GenerationError::InvalidRequest(
                "input must contain the most recent user message when chaining on previous_response_id"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// End-user identity attached to provider requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserData {
    /// Stable end-user id.
    pub id: Option<String>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, String>,
}
