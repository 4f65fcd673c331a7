//! # gen-stack
//!
//! Provider-agnostic response generation: a streamed tool-call loop,
//! message-to-context adaptation, integer credit accounting and error
//! classification.
//!
//! This crate contains **no** provider-specific code. Concrete backends
//! live in sibling crates and implement [`Provider`] (or its object-safe
//! counterpart [`DynProvider`]).
//!
//! | Crate | Provider | Features |
//! |-------|----------|----------|
//! | [`gen-stack-openai`](https://docs.rs/gen-stack-openai) | `OpenAI` Responses API | Streaming, tools, reasoning, moderation, response chaining |
//!
//! # Architecture
//!
//! ```text
//!   caller ──▶ GenerationService ──▶ DynProvider ──▶ (HTTP, SSE)
//!                 │      │     │
//!                 │      │     └──▶ ExecutableToolRegistry
//!                 │      └───────▶ ModelCatalog (limits, prices)
//!                 └──────────────▶ ServiceRegistry (failure reports)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use gen_stack::catalog::ModelCatalog;
//! use gen_stack::registry::ProviderConfig;
//! use gen_stack::{GenerationRequest, GenerationService, Message, ProviderRegistry, StreamEvent};
//!
//! # async fn example(catalog: ModelCatalog) -> Result<(), gen_stack::GenerationError> {
//! let provider = ProviderRegistry::global().build(&ProviderConfig::new("openai"))?;
//! let service = GenerationService::new(Arc::from(provider), Arc::new(catalog));
//!
//! let mut events = service.generate_response_streaming(GenerationRequest {
//!     max_tokens: Some(1024),
//!     ..GenerationRequest::new(vec![Message::user("Explain ownership in Rust")])
//! });
//! while let Some(event) = events.next().await {
//!     if let StreamEvent::Done { cost } = event? {
//!         println!("spent {cost}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Per-model limits, prices and name resolution |
//! | [`context`] | Stored messages to provider context items |
//! | [`cost`] | Output-token restraint and per-turn credit cost |
//! | [`error`] | [`GenerationError`] and its [`ErrorKind`] classification |
//! | [`estimate`] | Pluggable token estimation with a heuristic fallback |
//! | [`health`] | Failure reporting and per-provider health |
//! | [`message`] | The application's stored message types |
//! | [`provider`] | The [`Provider`] trait and per-turn request types |
//! | [`registry`] | Building providers from configuration |
//! | [`service`] | The [`GenerationService`] and its streamed loop |
//! | [`stream`] | Provider and caller stream events |
//! | [`tool`] | Tool handlers and the executable registry |
//! | [`usage`] | Token counts and [`Credits`] |
//! | [`world`] | Persona and facts rendered into the system prompt |

#![warn(missing_docs)]

pub mod catalog;
pub mod context;
pub mod cost;
pub mod error;
pub mod estimate;
pub mod health;
pub mod message;
pub mod provider;
pub mod registry;
pub mod service;
pub mod stream;
pub mod tool;
pub mod usage;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

// ── Core re-exports ────────────────────────────────────────────────
//
// Types nearly every program touches are re-exported at the root.
// Everything else lives in its submodule:
//
//   gen_stack::catalog::*   ModelCatalog, ModelInfo
//   gen_stack::estimate::*  TokenEstimator, HeuristicEstimator
//   gen_stack::health::*    ServiceRegistry, HealthRegistry
//   gen_stack::registry::*  ProviderConfig, ProviderFactory
//   gen_stack::tool::*      ToolRegistry, tool_fn, ToolError
//   gen_stack::mock::*      MockProvider (test-utils feature)

pub use context::{ContextItem, generate_context};
pub use error::{ErrorKind, GenerationError};
pub use message::{FunctionCall, Message, Role, ToolCall};
pub use provider::{
    Capability, DynProvider, JsonSchema, Provider, ProviderMetadata, ReasoningEffort,
    ResponseRequest, SafetyVerdict, ToolDefinition,
};
pub use registry::ProviderRegistry;
pub use service::{GenerationRequest, GenerationService, ServiceConfig, UserData};
pub use stream::{EventStream, FunctionCallItem, ProviderEvent, ProviderStream, StreamEvent};
pub use usage::{Credits, Usage};
pub use world::World;
