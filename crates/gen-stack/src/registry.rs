//! Provider registry keyed by provider id.
//!
//! Concrete providers live in sibling crates. Each registers a
//! [`ProviderFactory`] under its id (`"openai"`, ...), and application
//! code builds whichever one its configuration names without knowing the
//! concrete type:
//!
//! ```rust,no_run
//! use gen_stack::registry::{ProviderConfig, ProviderRegistry};
//!
//! let config = ProviderConfig::new("openai")
//!     .api_key("sk-...")
//!     .model("gpt-4o-mini");
//!
//! let provider = ProviderRegistry::global().build(&config)?;
//! # Ok::<(), gen_stack::GenerationError>(())
//! ```
//!
//! Ids are case-insensitive. Registering an id twice replaces the first
//! factory.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use serde::Deserialize;

use crate::error::GenerationError;
use crate::provider::DynProvider;

/// Configuration for building a provider from the registry.
///
/// Fields shared by all providers are typed. Provider-specific options go
/// in `extra`; each provider documents the keys it reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider id (e.g. `"openai"`).
    pub provider: String,
    /// API key for authenticated providers.
    pub api_key: Option<String>,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    /// Custom base URL for the API endpoint.
    pub base_url: Option<String>,
    /// Request timeout.
    #[serde(with = "duration_secs")]
    pub timeout: Option<Duration>,
    /// Provider-specific options.
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Creates a config for the given provider id.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a provider-specific option.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Gets a string value from extra options.
    pub fn get_extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64))
    }
}

/// Builds one kind of provider from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Lowercase provider id used for registration and lookup.
    fn name(&self) -> &str;

    /// Creates a provider instance.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, GenerationError>;
}

/// Provider factories keyed by id.
///
/// Use [`ProviderRegistry::global()`] for the process-wide registry, or
/// [`ProviderRegistry::new()`] for isolated ones (tests).
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ProviderFactory>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ProviderRegistry::new)
    }

    /// Registers a factory, replacing any with the same id.
    pub fn register(&self, factory: Box<dyn ProviderFactory>) -> &Self {
        self.register_shared(Arc::from(factory))
    }

    /// Registers a shared factory, replacing any with the same id.
    pub fn register_shared(&self, factory: Arc<dyn ProviderFactory>) -> &Self {
        let name = factory.name().to_lowercase();
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, factory);
        self
    }

    /// Removes a factory. Returns `true` if one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_lowercase())
            .is_some()
    }

    /// Checks if a provider id is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&name.to_lowercase())
    }

    /// Returns the registered provider ids, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Builds the provider named by `config.provider`.
    ///
    /// # Errors
    ///
    /// [`GenerationError::InvalidRequest`] if no factory is registered
    /// under that id, or whatever the factory returns.
    pub fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, GenerationError> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config.provider.to_lowercase())
            .cloned();

        match factory {
            Some(factory) => factory.build(config),
            None => Err(GenerationError::InvalidRequest(format!(
                "unknown provider '{}'. Available: {:?}",
                config.provider,
                self.providers()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::test_helpers::mock_metadata;

    struct MockFactory;

    impl ProviderFactory for MockFactory {
        fn name(&self) -> &str {
            "Mock"
        }

        fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, GenerationError> {
            let mut meta = mock_metadata();
            if let Some(model) = &config.model {
                meta.default_model.clone_from(model);
            }
            Ok(Box::new(MockProvider::new(meta)))
        }
    }

    #[test]
    fn test_register_and_build_case_insensitive() {
        let registry = ProviderRegistry::new();
        registry.register(Box::new(MockFactory));
        assert!(registry.contains("MOCK"));
        assert_eq!(registry.providers(), vec!["mock".to_string()]);

        let provider = registry
            .build(&ProviderConfig::new("mock").model("custom-model"))
            .unwrap();
        assert_eq!(provider.metadata().default_model, "custom-model");
    }

    #[test]
    fn test_build_unknown_provider() {
        let registry = ProviderRegistry::new();
        registry.register(Box::new(MockFactory));
        let Err(err) = registry.build(&ProviderConfig::new("nope")) else {
            panic!("expected an error");
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown provider 'nope'"));
        assert!(msg.contains("mock"));
    }

    #[test]
    fn test_unregister() {
        let registry = ProviderRegistry::new();
        registry.register(Box::new(MockFactory));
        assert!(registry.unregister("mock"));
        assert!(!registry.unregister("mock"));
        assert!(registry.providers().is_empty());
    }

    #[test]
    fn test_config_builder_and_extra() {
        let config = ProviderConfig::new("openai")
            .api_key("k")
            .base_url("http://localhost:1234")
            .timeout(Duration::from_secs(5))
            .extra("organization", "org-1");
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.get_extra_str("organization"), Some("org-1"));
        assert_eq!(config.get_extra_str("missing"), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"provider": "openai", "model": "gpt-4o", "timeout": 2.5, "extra": {"project": "p"}}"#,
        )
        .unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.get_extra_str("project"), Some("p"));
    }

    #[test]
    fn test_global_is_singleton() {
        assert!(std::ptr::eq(
            ProviderRegistry::global(),
            ProviderRegistry::global()
        ));
    }
}
