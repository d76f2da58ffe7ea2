use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AttributionError;
use crate::AttributionResult;

/// Portfolio or category weight as a decimal fraction. Not required to sum to 1.
pub type Weight = rust_decimal::Decimal;

/// Period returns expressed as decimals (0.10 = 10%). Never as percentages.
pub type Rate = rust_decimal::Decimal;

/// An allocation, selection+interaction or total effect, in return units.
pub type Effect = rust_decimal::Decimal;

/// Label of the summary row that aggregates every category.
pub const TOTAL_LABEL: &str = "Total";

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

pub(crate) fn checked_add(a: Decimal, b: Decimal, context: &str) -> AttributionResult<Decimal> {
    a.checked_add(b).ok_or_else(|| AttributionError::overflow(context))
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal, context: &str) -> AttributionResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| AttributionError::overflow(context))
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal, context: &str) -> AttributionResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| AttributionError::overflow(context))
}

/// `a / b`; a zero divisor is an invalid input.
pub(crate) fn checked_div(a: Decimal, b: Decimal, context: &str) -> AttributionResult<Decimal> {
    if b.is_zero() {
        return Err(AttributionError::invalid(context, "division by zero"));
    }
    a.checked_div(b).ok_or_else(|| AttributionError::overflow(context))
}

pub(crate) fn checked_sum<I>(values: I, context: &str) -> AttributionResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add(acc, v, context))
}

/// Π(1 + r) over `rates`; 1 when empty.
pub(crate) fn growth_factor(rates: &[Rate], context: &str) -> AttributionResult<Decimal> {
    rates.iter().try_fold(Decimal::ONE, |acc, r| {
        checked_mul(acc, checked_add(Decimal::ONE, *r, context)?, context)
    })
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
