//! Factory for building `OpenAI` providers from configuration.

use gen_stack::registry::{ProviderConfig, ProviderFactory};
use gen_stack::{DynProvider, GenerationError};

use crate::{OpenAiConfig, OpenAiProvider};

/// Factory for creating [`OpenAiProvider`] instances from configuration.
///
/// ```rust,no_run
/// use gen_stack::ProviderRegistry;
/// use gen_stack_openai::OpenAiFactory;
///
/// ProviderRegistry::global().register(Box::new(OpenAiFactory));
/// ```
///
/// # Configuration
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `provider` | Yes | Must be `"openai"` |
/// | `api_key` | Yes | `OpenAI` API key |
/// | `model` | No | Default model, `gpt-4o-mini` when unset |
/// | `base_url` | No | Custom API endpoint |
/// | `timeout` | No | Request timeout |
/// | `extra.organization` | No | Organization id header |
/// | `extra.project` | No | Project id header |
/// | `extra.moderation_model` | No | Model for `POST /moderations` |
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiFactory;

impl ProviderFactory for OpenAiFactory {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GenerationError::InvalidRequest("openai provider requires api_key".into())
            })?;

        let mut openai_config = OpenAiConfig {
            api_key,
            ..Default::default()
        };

        if let Some(model) = config.model.as_ref().filter(|m| !m.is_empty()) {
            openai_config.model.clone_from(model);
        }
        if let Some(base_url) = &config.base_url {
            openai_config.base_url.clone_from(base_url);
        }
        if let Some(timeout) = config.timeout {
            openai_config.timeout = Some(timeout);
        }
        if let Some(organization) = config.get_extra_str("organization") {
            openai_config.organization = Some(organization.to_string());
        }
        if let Some(project) = config.get_extra_str("project") {
            openai_config.project = Some(project.to_string());
        }
        if let Some(model) = config.get_extra_str("moderation_model") {
            openai_config.moderation_model = model.to_string();
        }

        Ok(Box::new(OpenAiProvider::new(openai_config)))
    }
}

/// Registers the `OpenAI` factory with the global registry.
pub fn register_global() {
    gen_stack::ProviderRegistry::global().register(Box::new(OpenAiFactory));
}
