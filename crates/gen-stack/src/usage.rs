//! Token usage and credit accounting.
//!
//! Every completed provider turn reports a [`Usage`] record. The cost
//! model turns it into [`Credits`], the integer-scaled unit used for
//! metering.
//!
//! # Credit scale
//!
//! Catalog prices are integer **cents per million tokens**. One cent is
//! [`CREDITS_PER_CENT`] credits, so the cost of `n` tokens at `p` cents
//! per million is exactly `n * p` credits: no division, no rounding, no
//! floating point. Use [`Credits::as_cents`] only for display.

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Credits in one cent.
pub const CREDITS_PER_CENT: u64 = 1_000_000;

/// Token counts for a single provider turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the input context.
    pub input_tokens: u64,
    /// Tokens produced by the model.
    pub output_tokens: u64,
    /// Of `output_tokens`, how many were spent on reasoning.
    pub reasoning_tokens: Option<u64>,
    /// Of `input_tokens`, how many were served from the provider's cache.
    pub cached_input_tokens: Option<u64>,
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.saturating_add(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += &rhs;
        self
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        *self += &rhs;
    }
}

impl AddAssign<&Usage> for Usage {
    fn add_assign(&mut self, rhs: &Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
        self.reasoning_tokens = add_optional(self.reasoning_tokens, rhs.reasoning_tokens);
        self.cached_input_tokens = add_optional(self.cached_input_tokens, rhs.cached_input_tokens);
    }
}

/// An amount of credits.
///
/// Serializes as a bare integer so it can travel inside a
/// [`StreamEvent::Done`](crate::StreamEvent::Done) payload unchanged.
///
/// ```rust
/// use gen_stack::usage::{Credits, CREDITS_PER_CENT};
///
/// let budget = Credits::from_cents(5);
/// assert_eq!(budget.get(), 5 * CREDITS_PER_CENT);
/// assert_eq!(budget.checked_sub(Credits::new(1)), Some(Credits::new(4_999_999)));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Credits(u64);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw credit amount.
    pub const fn new(credits: u64) -> Self {
        Self(credits)
    }

    /// Converts whole cents into credits, saturating on overflow.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents.saturating_mul(CREDITS_PER_CENT))
    }

    /// Returns the raw credit amount.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the sum, or `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Returns the difference, or `None` if `rhs` exceeds `self`.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Amount in cents, for display purposes only.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_cents(self) -> f64 {
        self.0 as f64 / CREDITS_PER_CENT as f64
    }
}

impl Add for Credits {
    type Output = Self;

    /// Saturating addition. Use [`checked_add`](Self::checked_add) when
    /// overflow must be detected.
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Credits {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} credits", self.0)
    }
}
