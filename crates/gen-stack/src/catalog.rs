//! Static per-model data: limits, pricing and capabilities.
//!
//! The catalog is read-only for the lifetime of a
//! [`GenerationService`](crate::GenerationService) and is the single
//! source of truth for prices. Both the budget restraint and the streamed
//! `done` cost read it.
//!
//! Catalogs can be built in code or loaded from a JSON array:
//!
//! ```rust
//! use gen_stack::catalog::ModelCatalog;
//!
//! let catalog = ModelCatalog::from_json(r#"[
//!     {"name": "gpt-4o", "provider": "openai", "context_window": 128000,
//!      "max_output_tokens": 16384, "input_cost": 250, "output_cost": 1000}
//! ]"#).unwrap();
//! assert_eq!(catalog.resolve("openai", Some("gpt-4o-2024-08-06")), Some("gpt-4o"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Catalog entry for one model.
///
/// Prices are integer cents per million tokens. A missing price is a
/// configuration bug that the cost model reports as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Concrete model identifier sent to the provider.
    pub name: String,
    /// Id of the provider serving this model (e.g. `"openai"`).
    pub provider: String,
    /// Maximum context window in tokens.
    pub context_window: u64,
    /// Largest number of output tokens one response may produce.
    pub max_output_tokens: u64,
    /// Input price in cents per million tokens.
    #[serde(default)]
    pub input_cost: Option<u64>,
    /// Output price in cents per million tokens.
    #[serde(default)]
    pub output_cost: Option<u64>,
    /// Whether the model accepts a reasoning-effort hint.
    #[serde(default)]
    pub supports_reasoning: bool,
    /// Tokenizer encoding, used as the token estimator's strategy hint.
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ModelInfo {
    /// Input price, or a [`GenerationError::Catalog`] naming the model.
    pub fn input_rate(&self) -> Result<u64, GenerationError> {
        self.input_cost.ok_or_else(|| {
            GenerationError::Catalog(format!("model {} has no input cost", self.name))
        })
    }

    /// Output price, or a [`GenerationError::Catalog`] naming the model.
    pub fn output_rate(&self) -> Result<u64, GenerationError> {
        self.output_cost.ok_or_else(|| {
            GenerationError::Catalog(format!("model {} has no output cost", self.name))
        })
    }
}

/// A set of [`ModelInfo`]s keyed by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelInfo>,
}

impl ModelCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of [`ModelInfo`] entries.
    pub fn from_json(json: &str) -> Result<Self, GenerationError> {
        let entries: Vec<ModelInfo> = serde_json::from_str(json)
            .map_err(|e| GenerationError::Catalog(format!("invalid catalog: {e}")))?;
        Ok(entries.into_iter().collect())
    }

    /// Adds or replaces an entry, returning `self` for chaining.
    #[must_use]
    pub fn with_model(mut self, info: ModelInfo) -> Self {
        self.insert(info);
        self
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, info: ModelInfo) {
        self.models.insert(info.name.clone(), info);
    }

    /// Looks up a model by exact name.
    pub fn get(&self, model: &str) -> Option<&ModelInfo> {
        self.models.get(model)
    }

    /// Looks up a model, failing with [`GenerationError::Catalog`].
    pub fn require(&self, model: &str) -> Result<&ModelInfo, GenerationError> {
        self.get(model)
            .ok_or_else(|| GenerationError::Catalog(format!("unknown model: {model}")))
    }

    /// Iterates over the entries of one provider, in name order.
    pub fn models_for<'a>(&'a self, provider: &str) -> impl Iterator<Item = &'a ModelInfo> {
        self.models.values().filter(move |m| m.provider == provider)
    }

    /// Normalizes a model name hint to a concrete catalog name.
    ///
    /// An exact match wins. Otherwise the longest catalog name of
    /// `provider` that prefixes the hint is chosen, so dated snapshots
    /// like `gpt-4o-2024-08-06` resolve to `gpt-4o`. Returns `None` when
    /// nothing matches.
    pub fn resolve<'a>(&'a self, provider: &str, hint: Option<&str>) -> Option<&'a str> {
        let hint = hint.map(str::trim).filter(|h| !h.is_empty())?;
        if let Some(info) = self.get(hint).filter(|m| m.provider == provider) {
            return Some(info.name.as_str());
        }
        self.models_for(provider)
            .filter(|m| hint.starts_with(m.name.as_str()))
            .max_by_key(|m| m.name.len())
            .map(|m| m.name.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl FromIterator<ModelInfo> for ModelCatalog {
    fn from_iter<I: IntoIterator<Item = ModelInfo>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for info in iter {
            catalog.insert(info);
        }
        catalog
    }
}
