//! The Generation Service.
//!
//! [`GenerationService`] binds one provider to its collaborators (model
//! catalog, tool registry, token estimator, service registry) and exposes
//! the generation contract:
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`generate_response_streaming`](GenerationService::generate_response_streaming) | Streamed generation with the tool-call loop |
//! | [`generate_context`](GenerationService::generate_context) | Messages to provider context items |
//! | [`estimate_tokens`](GenerationService::estimate_tokens) | Token estimate, never fails |
//! | [`get_model`](GenerationService::get_model) | Model name normalization |
//! | [`max_output_tokens_restrained`](GenerationService::max_output_tokens_restrained) | Output tokens under a credit ceiling |
//! | [`response_cost`](GenerationService::response_cost) | Credits for one turn's usage |
//! | [`error_kind`](GenerationService::error_kind) | Error classification |
//! | [`safe_input_check`](GenerationService::safe_input_check) | Moderation |
//!
//! The service holds no per-call mutable state and is cheap to clone.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use gen_stack::catalog::ModelCatalog;
//! use gen_stack::{DynProvider, GenerationRequest, GenerationService, Message, StreamEvent};
//!
//! # async fn example(provider: Arc<dyn DynProvider>, catalog: ModelCatalog) {
//! let service = GenerationService::new(provider, Arc::new(catalog));
//! let mut events = service.generate_response_streaming(GenerationRequest::new(vec![
//!     Message::user("Summarize the plot of Hamlet"),
//! ]));
//! while let Some(event) = events.next().await {
//!     match event {
//!         Ok(StreamEvent::Text { content }) => print!("{content}"),
//!         Ok(StreamEvent::Done { cost }) => println!("\n{cost}"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! # }
//! ```

mod request;
mod turn_loop;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::Deserialize;

pub use request::{GenerationRequest, UserData};

use crate::catalog::ModelCatalog;
use crate::context::{self, ContextItem};
use crate::error::{ErrorKind, GenerationError};
use crate::estimate::{
    EstimateRequest, HEURISTIC_STRATEGY, HeuristicEstimator, TokenEstimate, TokenEstimator,
};
use crate::health::ServiceRegistry;
use crate::message::Message;
use crate::provider::{Capability, DynProvider, SafetyVerdict};
use crate::stream::EventStream;
use crate::tool::{ExecutableToolRegistry, ToolRegistry};
use crate::usage::{Credits, Usage};
use crate::world::World;
use crate::{cost, estimate};

/// Service-level settings, typically loaded from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Overrides the provider's default model.
    pub default_model: Option<String>,
    /// World rendered into the system prompt when a history has none.
    pub world: World,
    /// Estimation strategy for models without a catalog encoding.
    pub estimation_strategy: Option<String>,
}

/// Orchestrates generation against one provider.
#[derive(Clone)]
pub struct GenerationService {
    provider: Arc<dyn DynProvider>,
    catalog: Arc<ModelCatalog>,
    tools: Arc<dyn ExecutableToolRegistry>,
    estimator: Arc<dyn TokenEstimator>,
    services: Option<Arc<dyn ServiceRegistry>>,
    provider_id: String,
    default_model: String,
    world: World,
    estimation_strategy: String,
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("provider", &self.provider_id)
            .field("default_model", &self.default_model)
            .field("catalog_models", &self.catalog.len())
            .field("has_service_registry", &self.services.is_some())
            .finish_non_exhaustive()
    }
}

impl GenerationService {
    /// Creates a service with an empty tool registry and the heuristic
    /// token estimator. The default model is the provider's.
    pub fn new(provider: Arc<dyn DynProvider>, catalog: Arc<ModelCatalog>) -> Self {
        let meta = provider.metadata();
        Self {
            provider,
            catalog,
            tools: Arc::new(ToolRegistry::new()),
            estimator: Arc::new(HeuristicEstimator),
            services: None,
            provider_id: meta.name.into_owned(),
            default_model: meta.default_model,
            world: World::default(),
            estimation_strategy: HEURISTIC_STRATEGY.to_owned(),
        }
    }

    /// Applies a [`ServiceConfig`].
    #[must_use]
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        if let Some(model) = config.default_model {
            self.default_model = model;
        }
        if let Some(strategy) = config.estimation_strategy {
            self.estimation_strategy = strategy;
        }
        self.world = config.world;
        self
    }

    /// Sets the registry tool calls are resolved against.
    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn ExecutableToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the token estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Sets the registry informed of classified provider failures.
    #[must_use]
    pub fn with_service_registry(mut self, services: Arc<dyn ServiceRegistry>) -> Self {
        self.services = Some(services);
        self
    }

    /// Provider id, also the service id reported on failures.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Model used when a request names none or an unknown one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The configured world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Starts a streamed generation.
    ///
    /// The returned stream is lazy: nothing happens until it is polled.
    /// It yields text fragments as they arrive and ends with exactly one
    /// [`StreamEvent::Done`](crate::StreamEvent::Done) carrying the cost
    /// of every turn, or with a single error. Dropping it cancels the open
    /// provider stream and any running tools.
    ///
    /// Each turn in which the model calls tools triggers another turn,
    /// with no upper bound. A tool set that always provokes a further
    /// call never terminates; bound it with `max_credits` or by dropping
    /// the stream.
    pub fn generate_response_streaming(&self, request: GenerationRequest) -> EventStream {
        turn_loop::generation_stream(self.clone(), request)
    }

    /// Builds provider context items for `messages`. See
    /// [`context::generate_context`].
    pub fn generate_context(&self, messages: &[Message], world: &World) -> Vec<ContextItem> {
        context::generate_context(messages, world)
    }

    /// Estimates tokens in `text` for `model`.
    ///
    /// The strategy hint is the model's catalog encoding, or the
    /// configured default for models the catalog doesn't know. Estimator
    /// failures fall back to the heuristic.
    pub fn estimate_tokens(&self, model: &str, text: &str) -> TokenEstimate {
        let strategy = self
            .catalog
            .get(model)
            .and_then(|info| info.encoding.as_deref())
            .unwrap_or(self.estimation_strategy.as_str());
        match self.estimator.estimate(strategy, EstimateRequest { model, text }) {
            Ok(estimate) => estimate,
            Err(e) => {
                tracing::debug!(model, strategy, error = %e, "falling back to heuristic estimate");
                HeuristicEstimator::estimate_text(model, text)
            }
        }
    }

    /// Estimated input tokens for a whole context.
    fn estimate_context_tokens(&self, model: &str, items: &[ContextItem]) -> u64 {
        items
            .iter()
            .map(|item| {
                self.estimate_tokens(model, item.text())
                    .tokens
                    .saturating_add(estimate::ITEM_OVERHEAD)
            })
            .fold(0, u64::saturating_add)
    }

    /// Normalizes a model name hint.
    ///
    /// Matches against this provider's catalog entries (exact, then
    /// longest prefix) and falls back to the default model.
    pub fn get_model(&self, hint: Option<&str>) -> String {
        self.catalog
            .resolve(&self.provider_id, hint)
            .unwrap_or(self.default_model.as_str())
            .to_owned()
    }

    /// Largest affordable output for `input_tokens` under `max_credits`.
    /// See [`cost::max_output_tokens_restrained`].
    pub fn max_output_tokens_restrained(
        &self,
        max_credits: Credits,
        model: &str,
        input_tokens: u64,
    ) -> Result<u64, GenerationError> {
        cost::max_output_tokens_restrained(&self.catalog, max_credits, model, input_tokens)
    }

    /// Credits for one turn's usage. See [`cost::response_cost`].
    pub fn response_cost(&self, model: &str, usage: &Usage) -> Result<Credits, GenerationError> {
        cost::response_cost(&self.catalog, model, usage)
    }

    /// Classifies an error with the provider's rules.
    pub fn error_kind(&self, error: &GenerationError) -> ErrorKind {
        self.provider.classify_error(error)
    }

    /// Runs the provider's moderation on `text`.
    ///
    /// A failed check is an infrastructure failure, not a verdict: the
    /// error is reported to the service registry and returned, never
    /// turned into `is_safe: false`.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Unsupported`] if the provider has no moderation
    /// capability, or whatever the provider returned.
    pub async fn safe_input_check(&self, text: &str) -> Result<SafetyVerdict, GenerationError> {
        if !self.provider.metadata().supports(Capability::Moderation) {
            return Err(GenerationError::Unsupported(format!(
                "provider {} has no moderation capability",
                self.provider_id
            )));
        }
        self.provider.moderate_boxed(text).await.inspect_err(|e| {
            self.report_failure(e);
        })
    }

    /// Classifies `error` and notifies the service registry.
    fn report_failure(&self, error: &GenerationError) -> ErrorKind {
        let kind = self.error_kind(error);
        tracing::warn!(provider = %self.provider_id, %kind, error = %error, "provider call failed");
        if let Some(services) = &self.services {
            let notify = AssertUnwindSafe(|| services.update_service_state(&self.provider_id, kind));
            if std::panic::catch_unwind(notify).is_err() {
                tracing::error!(provider = %self.provider_id, "service registry panicked");
            }
        }
        kind
    }

    /// Tells the service registry a turn streamed to completion.
    fn report_success(&self) {
        if let Some(services) = &self.services {
            let notify = AssertUnwindSafe(|| services.record_success(&self.provider_id));
            if std::panic::catch_unwind(notify).is_err() {
                tracing::error!(provider = %self.provider_id, "service registry panicked");
            }
        }
    }
}
