//! Token estimation.
//!
//! Exact counting depends on each model's tokenizer and is delegated to a
//! [`TokenEstimator`] the application supplies. The service passes a
//! strategy hint (the model's catalog `encoding`, or the configured
//! default) and falls back to [`HeuristicEstimator`] whenever the
//! estimator fails, so estimation itself never errors.

use serde::{Deserialize, Serialize};

/// Strategy name of [`HeuristicEstimator`].
pub const HEURISTIC_STRATEGY: &str = "heuristic";

/// Per-item overhead for role markers and item framing.
pub(crate) const ITEM_OVERHEAD: u64 = 4;

/// What to estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateRequest<'a> {
    /// Concrete model identifier.
    pub model: &'a str,
    /// Text to count.
    pub text: &'a str,
}

/// Result of an estimation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimate {
    /// Estimated token count.
    pub tokens: u64,
    /// Encoding or strategy that produced the count.
    pub encoding: String,
    /// Model whose tokenizer the count approximates.
    pub estimation_model: String,
}

/// Estimation failure reported by a [`TokenEstimator`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("token estimation failed: {0}")]
pub struct EstimateError(pub String);

/// Counts tokens for a model.
pub trait TokenEstimator: Send + Sync {
    /// Estimates `request` using the strategy named by `strategy`.
    ///
    /// Implementations should fail on strategies or models they don't
    /// know rather than guess; the caller falls back to the heuristic.
    fn estimate(
        &self,
        strategy: &str,
        request: EstimateRequest<'_>,
    ) -> Result<TokenEstimate, EstimateError>;
}

/// Roughly four bytes per token, which is close for English prose.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    /// Estimated tokens in `text`: `0` when empty, at least `1` otherwise.
    pub fn count(text: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        let len = u64::try_from(text.len()).unwrap_or(u64::MAX);
        len.div_ceil(4).max(1)
    }

    /// Heuristic estimate for `text`, attributed to `model`.
    pub fn estimate_text(model: &str, text: &str) -> TokenEstimate {
        TokenEstimate {
            tokens: Self::count(text),
            encoding: HEURISTIC_STRATEGY.to_owned(),
            estimation_model: model.to_owned(),
        }
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(
        &self,
        _strategy: &str,
        request: EstimateRequest<'_>,
    ) -> Result<TokenEstimate, EstimateError> {
        Ok(Self::estimate_text(request.model, request.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        assert_eq!(HeuristicEstimator::count(""), 0);
        assert_eq!(HeuristicEstimator::count("a"), 1);
        assert_eq!(HeuristicEstimator::count("abcd"), 1);
        assert_eq!(HeuristicEstimator::count("abcde"), 2);
        assert_eq!(HeuristicEstimator::count(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_heuristic_estimate_names_strategy() {
        let est = HeuristicEstimator
            .estimate(
                "cl100k_base",
                EstimateRequest {
                    model: "gpt-4o",
                    text: "hello world!",
                },
            )
            .unwrap();
        assert_eq!(est.tokens, 3);
        assert_eq!(est.encoding, HEURISTIC_STRATEGY);
        assert_eq!(est.estimation_model, "gpt-4o");
    }
}
