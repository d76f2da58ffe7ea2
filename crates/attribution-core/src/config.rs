use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::linking::LinkingMethod;
use crate::single_period::SinglePeriodMethod;

/// Tolerance around 1.0 before a weight sum is flagged in the warnings.
pub const DEFAULT_WEIGHT_TOLERANCE: Decimal = dec!(0.02);

/// How missing weights and returns in input records are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Fail the run.
    #[default]
    Error,
    /// Substitute zero.
    TreatAsZero,
}

/// How category sets that differ between periods (or between portfolio and
/// benchmark) are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryReconciliation {
    /// The first period's portfolio categories are authoritative; any
    /// difference is a `MissingCategory` error.
    #[default]
    Strict,
    /// Use the union of all categories; absent ones get zero weight and
    /// zero return.
    ZeroPad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub single_period: SinglePeriodMethod,
    pub linking: LinkingMethod,
    pub missing_values: MissingValuePolicy,
    pub categories: CategoryReconciliation,
    pub weight_tolerance: Decimal,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        AttributionConfig {
            single_period: SinglePeriodMethod::default(),
            linking: LinkingMethod::default(),
            missing_values: MissingValuePolicy::default(),
            categories: CategoryReconciliation::default(),
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
        }
    }
}

impl AttributionConfig {
    pub fn methodology(&self) -> String {
        format!(
            "{} single-period attribution with {} multi-period linking",
            self.single_period.description(),
            self.linking.description()
        )
    }

    pub fn assumptions(&self) -> HashMap<String, String> {
        let mut assumptions = HashMap::new();
        assumptions.insert("model".into(), self.single_period.description().into());
        assumptions.insert("linking_method".into(), self.linking.description().into());
        assumptions.insert(
            "missing_values".into(),
            match self.missing_values {
                MissingValuePolicy::Error => "error",
                MissingValuePolicy::TreatAsZero => "treat_as_zero",
            }
            .into(),
        );
        assumptions.insert(
            "category_reconciliation".into(),
            match self.categories {
                CategoryReconciliation::Strict => "strict",
                CategoryReconciliation::ZeroPad => "zero_pad",
            }
            .into(),
        );
        assumptions.insert("weight_tolerance".into(), self.weight_tolerance.to_string());
        assumptions
    }
}
