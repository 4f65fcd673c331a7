//! Built-in catalog of `OpenAI` models.

use gen_stack::catalog::{ModelCatalog, ModelInfo};

const ENCODING: &str = "o200k_base";

// (name, input cents/M, output cents/M, context window, max output, reasoning)
const MODELS: &[(&str, u64, u64, u64, u64, bool)] = &[
    ("gpt-4o", 250, 1000, 128_000, 16_384, false),
    ("gpt-4o-mini", 15, 60, 128_000, 16_384, false),
    ("gpt-4.1", 200, 800, 1_047_576, 32_768, false),
    ("gpt-4.1-mini", 40, 160, 1_047_576, 32_768, false),
    ("gpt-4.1-nano", 10, 40, 1_047_576, 32_768, false),
    ("o4-mini", 110, 440, 200_000, 100_000, true),
    ("o3", 200, 800, 200_000, 100_000, true),
    ("gpt-5", 125, 1000, 400_000, 128_000, true),
    ("gpt-5-mini", 25, 200, 400_000, 128_000, true),
];

/// Returns a [`ModelCatalog`] with current `OpenAI` text models and list
/// prices.
///
/// Extend or override entries with [`ModelCatalog::insert`] when prices
/// change or a new snapshot ships.
pub fn openai_catalog() -> ModelCatalog {
    MODELS
        .iter()
        .map(
            |&(name, input, output, context_window, max_output_tokens, reasoning)| ModelInfo {
                name: name.into(),
                provider: "openai".into(),
                context_window,
                max_output_tokens,
                input_cost: Some(input),
                output_cost: Some(output),
                supports_reasoning: reasoning,
                encoding: Some(ENCODING.into()),
            },
        )
        .collect()
}
