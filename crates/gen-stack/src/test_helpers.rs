//! Pre-built helpers for testing code that uses `gen-stack`.
//!
//! Available with the `test-utils` feature so downstream crates can reuse
//! them, and compiled for this crate's own tests. Provides mock metadata,
//! a small priced catalog, stream collectors and a ready-wired
//! [`GenerationService`] over a [`MockProvider`].

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;

use crate::catalog::{ModelCatalog, ModelInfo};
use crate::error::GenerationError;
use crate::health::HealthRegistry;
use crate::mock::MockProvider;
use crate::provider::{Capability, ProviderMetadata};
use crate::service::GenerationService;
use crate::stream::{EventStream, FunctionCallItem, ProviderEvent, StreamEvent};
use crate::usage::Usage;

/// Metadata for a provider named `"mock"` with default model
/// `"mock-large"` and every capability.
pub fn mock_metadata() -> ProviderMetadata {
    ProviderMetadata {
        name: "mock".into(),
        default_model: "mock-large".into(),
        capabilities: HashSet::from([
            Capability::Tools,
            Capability::Reasoning,
            Capability::Moderation,
            Capability::ResponseChaining,
        ]),
    }
}

/// Two `"mock"` models.
///
/// | Model | Input | Output | Max output | Reasoning | Encoding |
/// |-------|-------|--------|------------|-----------|----------|
/// | `mock-large` | 100 | 400 | 16384 | yes | `mock-enc` |
/// | `mock-small` | 10 | 40 | 4096 | no | none |
pub fn sample_catalog() -> ModelCatalog {
    ModelCatalog::new()
        .with_model(ModelInfo {
            name: "mock-large".into(),
            provider: "mock".into(),
            context_window: 128_000,
            max_output_tokens: 16_384,
            input_cost: Some(100),
            output_cost: Some(400),
            supports_reasoning: true,
            encoding: Some("mock-enc".into()),
        })
        .with_model(ModelInfo {
            name: "mock-small".into(),
            provider: "mock".into(),
            context_window: 32_000,
            max_output_tokens: 4_096,
            input_cost: Some(10),
            output_cost: Some(40),
            supports_reasoning: false,
            encoding: None,
        })
}

/// A service over `mock` and [`sample_catalog`], reporting failures to
/// the returned [`HealthRegistry`].
pub fn service_for(mock: impl Into<Arc<MockProvider>>) -> (GenerationService, Arc<HealthRegistry>) {
    let mock: Arc<MockProvider> = mock.into();
    let health = Arc::new(HealthRegistry::new());
    let service = GenerationService::new(mock, Arc::new(sample_catalog()))
        .with_service_registry(health.clone());
    (service, health)
}

/// Returns a [`Usage`] with 100 input / 50 output tokens.
pub fn sample_usage() -> Usage {
    Usage {
        input_tokens: 100,
        output_tokens: 50,
        ..Default::default()
    }
}

/// A `FunctionCall` event with `id` derived from `call_id`.
pub fn function_call_event(call_id: &str, name: &str, arguments: &str) -> ProviderEvent {
    ProviderEvent::FunctionCall(FunctionCallItem {
        id: format!("fc_{call_id}"),
        call_id: call_id.into(),
        name: name.into(),
        arguments: arguments.into(),
    })
}

/// Collect stream events, returning results including errors.
pub async fn collect_stream_results(stream: EventStream) -> Vec<Result<StreamEvent, GenerationError>> {
    stream.collect::<Vec<_>>().await
}

/// Collect stream events, panicking on any error.
/// Use [`collect_stream_results`] when testing error scenarios.
pub async fn collect_stream(stream: EventStream) -> Vec<StreamEvent> {
    stream
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|r| r.expect("stream event should be Ok"))
        .collect()
}
