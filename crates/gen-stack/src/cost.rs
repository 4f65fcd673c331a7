//! Cost model: output-token restraint under a credit ceiling, and the
//! credit cost of a completed turn.
//!
//! All arithmetic is integer. Intermediates are widened to `u128` so
//! that `tokens * price` cannot overflow before the final clamp.

use crate::catalog::ModelCatalog;
use crate::error::GenerationError;
use crate::usage::{Credits, Usage};

/// Largest output-token count the credit budget allows for `model`.
///
/// Returns `0` when the input alone costs at least `max_credits`.
/// Otherwise the remaining budget is divided by the output price and
/// clamped to `max_output_tokens - input_tokens` (never negative), so a
/// generous budget still respects the model's hard ceiling. A free
/// output price yields the ceiling.
///
/// Fails with [`GenerationError::Catalog`] if the model or either of its
/// prices is missing.
pub fn max_output_tokens_restrained(
    catalog: &ModelCatalog,
    max_credits: Credits,
    model: &str,
    input_tokens: u64,
) -> Result<u64, GenerationError> {
    let info = catalog.require(model)?;
    let input_rate = info.input_rate()?;
    let output_rate = info.output_rate()?;

    let input_cost = u128::from(input_rate) * u128::from(input_tokens);
    let budget = u128::from(max_credits.get());
    if budget <= input_cost {
        return Ok(0);
    }

    let ceiling = info.max_output_tokens.saturating_sub(input_tokens);
    if output_rate == 0 {
        return Ok(ceiling);
    }
    let affordable = (budget - input_cost) / u128::from(output_rate);
    Ok(u64::try_from(affordable).unwrap_or(u64::MAX).min(ceiling))
}

/// Output tokens the budget pays for after the input, ignoring how much
/// of the model's output limit the input already uses.
///
/// Returns `None` when the input alone costs at least `max_credits`.
/// Otherwise the quotient is capped at the model's per-response
/// `max_output_tokens`, which also covers a free output price.
pub fn budget_output_tokens(
    catalog: &ModelCatalog,
    max_credits: Credits,
    model: &str,
    input_tokens: u64,
) -> Result<Option<u64>, GenerationError> {
    let info = catalog.require(model)?;
    let input_cost = u128::from(info.input_rate()?) * u128::from(input_tokens);
    let budget = u128::from(max_credits.get());
    if budget <= input_cost {
        return Ok(None);
    }

    let output_rate = info.output_rate()?;
    if output_rate == 0 {
        return Ok(Some(info.max_output_tokens));
    }
    let affordable = (budget - input_cost) / u128::from(output_rate);
    Ok(Some(
        u64::try_from(affordable)
            .unwrap_or(u64::MAX)
            .min(info.max_output_tokens),
    ))
}

/// Credit cost of one completed turn.
///
/// Call once per turn and accumulate; the generation loop keeps a running
/// total across tool-call turns.
pub fn response_cost(
    catalog: &ModelCatalog,
    model: &str,
    usage: &Usage,
) -> Result<Credits, GenerationError> {
    let info = catalog.require(model)?;
    let input = u128::from(usage.input_tokens) * u128::from(info.input_rate()?);
    let output = u128::from(usage.output_tokens) * u128::from(info.output_rate()?);
    let total = u64::try_from(input + output).unwrap_or(u64::MAX);
    Ok(Credits::new(total))
}
