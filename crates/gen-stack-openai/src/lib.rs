//! `OpenAI` Responses API provider for `gen-stack`.
//!
//! This crate implements [`Provider`](gen_stack::Provider) for the
//! [Responses API](https://platform.openai.com/docs/api-reference/responses),
//! with streaming, function tools, reasoning effort, `previous_response_id`
//! chaining and text moderation.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use gen_stack::{GenerationRequest, GenerationService, Message, StreamEvent};
//! use gen_stack_openai::{OpenAiConfig, OpenAiProvider, openai_catalog};
//!
//! # async fn example() -> Result<(), gen_stack::GenerationError> {
//! let provider = OpenAiProvider::new(OpenAiConfig {
//!     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!     model: "gpt-4.1-mini".into(),
//!     ..Default::default()
//! });
//! let service = GenerationService::new(Arc::new(provider), Arc::new(openai_catalog()));
//!
//! let mut events =
//!     service.generate_response_streaming(GenerationRequest::new(vec![Message::user("Hello!")]));
//! while let Some(event) = events.next().await {
//!     match event? {
//!         StreamEvent::Text { content } => print!("{content}"),
//!         StreamEvent::Done { cost } => println!("\n[{cost}]"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Config-driven setup
//!
//! ```rust,no_run
//! use gen_stack::ProviderRegistry;
//! use gen_stack::registry::ProviderConfig;
//!
//! gen_stack_openai::register_global();
//! let provider = ProviderRegistry::global()
//!     .build(&ProviderConfig::new("openai").api_key("sk-..."))
//!     .unwrap();
//! ```

#![warn(missing_docs)]

mod catalog;
mod config;
mod convert;
mod factory;
mod provider;
mod stream;
mod types;

pub use catalog::openai_catalog;
pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_MODERATION_MODEL, OpenAiConfig};
pub use factory::{OpenAiFactory, register_global};
pub use provider::OpenAiProvider;
