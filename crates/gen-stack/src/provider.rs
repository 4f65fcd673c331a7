//! Provider trait and request types.
//!
//! This module defines two core abstractions:
//!
//! - **[`Provider`]**: the trait every backend implements, written with
//!   native async-fn-in-traits. A backend maps its wire protocol onto
//!   [`ProviderEvent`](crate::ProviderEvent)s and its failures onto
//!   [`GenerationError`].
//!
//! - **[`DynProvider`]**: an object-safe mirror of `Provider` that uses
//!   boxed futures. A blanket `impl<T: Provider> DynProvider for T`
//!   bridges the two, so the
//!   [`GenerationService`](crate::GenerationService) can hold any backend
//!   as `Arc<dyn DynProvider>`.
//!
//! | Situation | Use |
//! |-----------|-----|
//! | Generic code that knows the concrete type | `Provider` |
//! | Storing providers behind `dyn` | `DynProvider` |
//! | Implementing a new backend | `impl Provider for MyBackend` |
//!
//! Optional behavior is advertised through [`Capability`] flags in
//! [`ProviderMetadata`]. A backend without [`Capability::Moderation`]
//! keeps the default [`Provider::moderate`], which fails with
//! [`GenerationError::Unsupported`].

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ContextItem;
use crate::error::{ErrorKind, GenerationError};
use crate::stream::ProviderStream;
use crate::usage::Credits;

/// The core trait every provider implements.
///
/// `Provider` is **not** object-safe because its methods return
/// `impl Future`. Use [`DynProvider`] for dynamic dispatch.
pub trait Provider: Send + Sync {
    /// Opens one streamed turn.
    ///
    /// The returned stream ends after a `Completed` or `Error` event, or
    /// when the transport closes. Dropping it early must release the
    /// connection.
    fn stream(
        &self,
        request: &ResponseRequest,
    ) -> impl Future<Output = Result<ProviderStream, GenerationError>> + Send;

    /// Runs the provider's content moderation on `text`.
    fn moderate(
        &self,
        _text: &str,
    ) -> impl Future<Output = Result<SafetyVerdict, GenerationError>> + Send {
        let name = Provider::metadata(self).name;
        std::future::ready(Err(GenerationError::Unsupported(format!(
            "provider {name} has no moderation endpoint"
        ))))
    }

    /// Classifies an error this provider produced.
    ///
    /// The default defers to [`GenerationError::kind`]. Override it when
    /// the provider's error codes carry more precise information than the
    /// HTTP status.
    fn classify_error(&self, error: &GenerationError) -> ErrorKind {
        error.kind()
    }

    /// Returns static metadata describing this provider instance.
    fn metadata(&self) -> ProviderMetadata;
}

/// Object-safe counterpart of [`Provider`] for dynamic dispatch.
///
/// You rarely implement this directly; the blanket impl does it.
pub trait DynProvider: Send + Sync {
    /// Boxed-future version of [`Provider::stream`].
    fn stream_boxed<'a>(
        &'a self,
        request: &'a ResponseRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderStream, GenerationError>> + Send + 'a>>;

    /// Boxed-future version of [`Provider::moderate`].
    fn moderate_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SafetyVerdict, GenerationError>> + Send + 'a>>;

    /// See [`Provider::classify_error`].
    fn classify_error(&self, error: &GenerationError) -> ErrorKind;

    /// Returns static metadata describing this provider instance.
    fn metadata(&self) -> ProviderMetadata;
}

impl<T: Provider> DynProvider for T {
    fn stream_boxed<'a>(
        &'a self,
        request: &'a ResponseRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderStream, GenerationError>> + Send + 'a>> {
        Box::pin(self.stream(request))
    }

    fn moderate_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SafetyVerdict, GenerationError>> + Send + 'a>> {
        Box::pin(self.moderate(text))
    }

    fn classify_error(&self, error: &GenerationError) -> ErrorKind {
        Provider::classify_error(self, error)
    }

    fn metadata(&self) -> ProviderMetadata {
        Provider::metadata(self)
    }
}

/// Describes a provider instance.
///
/// `name` doubles as the provider id: it keys the
/// [`ProviderRegistry`](crate::ProviderRegistry), filters the
/// [`ModelCatalog`](crate::catalog::ModelCatalog), and is the service id
/// reported to the [`ServiceRegistry`](crate::health::ServiceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider id (e.g. `"openai"`).
    pub name: Cow<'static, str>,
    /// Model used when a request names none or an unknown one.
    pub default_model: String,
    /// Feature flags indicating what this provider supports.
    pub capabilities: HashSet<Capability>,
}

impl ProviderMetadata {
    /// Returns `true` if the provider advertises `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// A feature that a provider may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Function/tool calling.
    Tools,
    /// Honors a reasoning-effort hint on models that support it.
    Reasoning,
    /// Content moderation endpoint.
    Moderation,
    /// Server-side conversation state via `previous_response_id`.
    ResponseChaining,
}

/// How much internal deliberation a reasoning model should spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Minimal deliberation.
    Low,
    /// Provider default.
    Medium,
    /// Maximum deliberation.
    High,
}

/// The provider create-call for one turn.
///
/// Serializes cleanly to JSON for logging and replay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseRequest {
    /// Concrete model identifier.
    pub model: String,
    /// Reasoning effort, only set for models that support it.
    pub reasoning: Option<ReasoningEffort>,
    /// Upper bound on generated tokens.
    pub max_output_tokens: Option<u64>,
    /// Ordered context items.
    pub input: Vec<ContextItem>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Whether the model may emit several tool calls in one turn.
    pub parallel_tool_calls: Option<bool>,
    /// Continue from this stored response instead of a full context.
    pub previous_response_id: Option<String>,
    /// End-user identifier forwarded for abuse monitoring.
    pub user: Option<String>,
    /// Free-form metadata forwarded to the provider.
    pub metadata: BTreeMap<String, String>,
}

/// Outcome of a moderation check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetyVerdict {
    /// `false` if the provider flagged the text.
    pub is_safe: bool,
    /// What the check cost.
    pub cost: Credits,
    /// Categories the provider flagged, if any.
    #[serde(default)]
    pub flagged_categories: Vec<String>,
}

/// A tool the model can invoke during generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool's name, matched against function-call items.
    pub name: String,
    /// Shown to the model so it knows when to use this tool.
    pub description: String,
    /// JSON Schema describing the tool's expected arguments.
    pub parameters: JsonSchema,
}

impl ToolDefinition {
    /// Creates a definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: JsonSchema::new(parameters),
        }
    }
}

/// A JSON Schema document used for tool parameters.
///
/// Wraps a [`serde_json::Value`]. With the `schema` feature (on by
/// default) it can be derived from a Rust type and used for validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a reference to the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Derives a JSON Schema from a type implementing [`schemars::JsonSchema`].
    #[cfg(feature = "schema")]
    pub fn from_type<T: schemars::JsonSchema>() -> Result<Self, serde_json::Error> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(schema)?;
        Ok(Self(value))
    }

    /// Validates `value` against this schema.
    ///
    /// On failure the messages of every violation are joined with `"; "`.
    /// A malformed schema is reported the same way.
    #[cfg(feature = "schema")]
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let validator =
            jsonschema::validator_for(&self.0).map_err(|e| format!("invalid JSON schema: {e}"))?;
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capability_hash_set() {
        let caps: HashSet<Capability> = HashSet::from([
            Capability::Tools,
            Capability::Reasoning,
            Capability::Moderation,
            Capability::ResponseChaining,
        ]);
        assert_eq!(caps.len(), 4);
    }

    #[test]
    fn test_metadata_supports() {
        let m = ProviderMetadata {
            name: "mock".into(),
            default_model: "m".into(),
            capabilities: HashSet::from([Capability::Tools]),
        };
        assert!(m.supports(Capability::Tools));
        assert!(!m.supports(Capability::Moderation));
    }

    #[test]
    fn test_metadata_owned_name() {
        let m = ProviderMetadata {
            name: Cow::Owned(String::from("custom")),
            default_model: "m".into(),
            capabilities: HashSet::new(),
        };
        assert_eq!(m.name, "custom");
    }

    #[test]
    fn test_reasoning_effort_wire_names() {
        assert_eq!(
            serde_json::to_value(ReasoningEffort::High).unwrap(),
            json!("high")
        );
        let back: ReasoningEffort = serde_json::from_value(json!("low")).unwrap();
        assert_eq!(back, ReasoningEffort::Low);
    }

    #[test]
    fn test_response_request_defaults() {
        let r = ResponseRequest::default();
        assert!(r.input.is_empty());
        assert!(r.tools.is_empty());
        assert!(r.previous_response_id.is_none());
        assert!(r.max_output_tokens.is_none());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_json_schema_from_type() {
        #[derive(schemars::JsonSchema)]
        struct Args {
            #[allow(dead_code)]
            city: String,
        }
        let schema = JsonSchema::from_type::<Args>().unwrap();
        assert!(schema.as_value()["properties"].get("city").is_some());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_json_schema_validate() {
        let schema = JsonSchema::new(json!({
            "type": "object",
            "properties": {"x": {"type": "integer"}},
            "required": ["x"]
        }));
        assert!(schema.validate(&json!({"x": 42})).is_ok());
        assert!(schema.validate(&json!({})).is_err());
        assert!(schema.validate(&json!({"x": "nope"})).is_err());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_json_schema_invalid_schema() {
        let schema = JsonSchema::new(json!({"type": "bogus_not_a_type"}));
        let err = schema.validate(&json!(42)).unwrap_err();
        assert!(err.contains("invalid JSON schema"));
    }

    #[test]
    fn test_tool_definition_new() {
        let td = ToolDefinition::new("search", "Search the web", json!({"type": "object"}));
        assert_eq!(td.parameters.as_value(), &json!({"type": "object"}));
    }
}
