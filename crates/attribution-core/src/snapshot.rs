use std::borrow::Cow;
use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AttributionError;
use crate::types::{checked_add, checked_div, checked_mul, checked_sum, Rate, Weight};
use crate::AttributionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One security (or one category, for category-level snapshots) in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub security: String,
    pub weight: Weight,
    #[serde(rename = "return")]
    pub return_: Rate,
    pub category: String,
}

/// Serialized form of a [`Snapshot`]; validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    pub holdings: Vec<Holding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<NaiveDate>,
}

/// Weights, returns and category labels of a portfolio or benchmark for one
/// period, held as aligned per-security series.
///
/// Returns of zero-weight securities are forced to zero on construction, so
/// they never leak into totals or category aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotData", into = "SnapshotData")]
pub struct Snapshot {
    securities: Vec<String>,
    weights: Vec<Weight>,
    returns: Vec<Rate>,
    categories: Vec<String>,
    period: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Snapshot {
    /// Build a snapshot from aligned holdings.
    pub fn new(holdings: Vec<Holding>, period: Option<NaiveDate>) -> AttributionResult<Self> {
        if holdings.is_empty() {
            return Err(AttributionError::invalid(
                "holdings",
                format!("snapshot for {} has no holdings", period_label(period)),
            ));
        }

        let mut seen = HashSet::with_capacity(holdings.len());
        let mut securities = Vec::with_capacity(holdings.len());
        let mut weights = Vec::with_capacity(holdings.len());
        let mut returns = Vec::with_capacity(holdings.len());
        let mut categories = Vec::with_capacity(holdings.len());

        for h in holdings {
            if !seen.insert(h.security.clone()) {
                return Err(AttributionError::invalid(
                    "security",
                    format!(
                        "duplicate security '{}' in snapshot for {}",
                        h.security,
                        period_label(period)
                    ),
                ));
            }
            let ret = if h.weight.is_zero() {
                Decimal::ZERO
            } else {
                h.return_
            };
            securities.push(h.security);
            weights.push(h.weight);
            returns.push(ret);
            categories.push(h.category);
        }

        Ok(Snapshot {
            securities,
            weights,
            returns,
            categories,
            period,
        })
    }

    /// Build a snapshot from three security-keyed series.
    ///
    /// The series must carry the same security ids in the same order.
    pub fn from_series(
        weights: Vec<(String, Weight)>,
        returns: Vec<(String, Rate)>,
        categories: Vec<(String, String)>,
        period: Option<NaiveDate>,
    ) -> AttributionResult<Self> {
        if weights.len() != returns.len() || weights.len() != categories.len() {
            return Err(AttributionError::invalid(
                "series",
                format!(
                    "weights ({}), returns ({}) and categories ({}) differ in length",
                    weights.len(),
                    returns.len(),
                    categories.len()
                ),
            ));
        }

        let mut holdings = Vec::with_capacity(weights.len());
        for (i, (((wid, w), (rid, r)), (cid, c))) in weights
            .into_iter()
            .zip(returns)
            .zip(categories)
            .enumerate()
        {
            if wid != rid || wid != cid {
                return Err(AttributionError::invalid(
                    "series",
                    format!(
                        "index mismatch at position {}: weights '{}', returns '{}', categories '{}'",
                        i, wid, rid, cid
                    ),
                ));
            }
            holdings.push(Holding {
                security: wid,
                weight: w,
                return_: r,
                category: c,
            });
        }

        Snapshot::new(holdings, period)
    }
}

impl TryFrom<SnapshotData> for Snapshot {
    type Error = AttributionError;

    fn try_from(data: SnapshotData) -> Result<Self, Self::Error> {
        Snapshot::new(data.holdings, data.period)
    }
}

impl From<Snapshot> for SnapshotData {
    fn from(s: Snapshot) -> Self {
        let period = s.period;
        SnapshotData {
            holdings: s.holdings().collect(),
            period,
        }
    }
}

// ---------------------------------------------------------------------------
// Accessors and aggregates
// ---------------------------------------------------------------------------

impl Snapshot {
    pub fn len(&self) -> usize {
        self.securities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.securities.is_empty()
    }

    pub fn period(&self) -> Option<NaiveDate> {
        self.period
    }

    pub fn with_period(mut self, period: Option<NaiveDate>) -> Self {
        self.period = period;
        self
    }

    pub fn securities(&self) -> &[String] {
        &self.securities
    }

    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    pub fn returns(&self) -> &[Rate] {
        &self.returns
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn holdings(&self) -> impl Iterator<Item = Holding> + '_ {
        (0..self.len()).map(move |i| Holding {
            security: self.securities[i].clone(),
            weight: self.weights[i],
            return_: self.returns[i],
            category: self.categories[i].clone(),
        })
    }

    /// Distinct category labels in order of first appearance.
    pub fn unique_categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }

    pub fn total_weight(&self) -> AttributionResult<Weight> {
        checked_sum(self.weights.iter().copied(), "total weight")
    }

    /// Weight-weighted sum of returns.
    pub fn total_return(&self) -> AttributionResult<Rate> {
        let contributions = self
            .weights
            .iter()
            .zip(&self.returns)
            .map(|(w, r)| checked_mul(*w, *r, "total return"))
            .collect::<AttributionResult<Vec<_>>>()?;
        checked_sum(contributions, "total return")
    }

    pub fn weights_by_category(&self) -> AttributionResult<Vec<(String, Weight)>> {
        self.unique_categories()
            .into_iter()
            .map(|cat| {
                let w = self.category_weight(&cat)?;
                Ok((cat, w))
            })
            .collect()
    }

    /// Weight-weighted category returns. A zero-weight category returns 0.
    pub fn returns_by_category(&self) -> AttributionResult<Vec<(String, Rate)>> {
        self.unique_categories()
            .into_iter()
            .map(|cat| {
                let w = self.category_weight(&cat)?;
                let r = if w.is_zero() {
                    Decimal::ZERO
                } else {
                    checked_div(self.category_contribution(&cat)?, w, "category return")?
                };
                Ok((cat, r))
            })
            .collect()
    }

    fn category_weight(&self, category: &str) -> AttributionResult<Weight> {
        checked_sum(
            self.weights
                .iter()
                .zip(&self.categories)
                .filter(|(_, c)| c.as_str() == category)
                .map(|(w, _)| *w),
            "category weight",
        )
    }

    fn category_contribution(&self, category: &str) -> AttributionResult<Decimal> {
        let mut sum = Decimal::ZERO;
        for i in (0..self.len()).filter(|&i| self.categories[i] == category) {
            let contribution = checked_mul(self.weights[i], self.returns[i], "category return")?;
            sum = checked_add(sum, contribution, "category return")?;
        }
        Ok(sum)
    }
}

// ---------------------------------------------------------------------------
// Category level
// ---------------------------------------------------------------------------

impl Snapshot {
    /// True when every category label appears exactly once.
    pub fn is_category_level(&self) -> bool {
        self.unique_categories().len() == self.categories.len()
    }

    /// Aggregate to one row per category; the category label doubles as the
    /// row's security id.
    pub fn to_category_snapshot(&self) -> AttributionResult<Snapshot> {
        let (categories, weights): (Vec<String>, Vec<Weight>) =
            self.weights_by_category()?.into_iter().unzip();
        let returns = self
            .returns_by_category()?
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        Ok(Snapshot {
            securities: categories.clone(),
            weights,
            returns,
            categories,
            period: self.period,
        })
    }

    /// Borrow when already category level, aggregate otherwise.
    pub fn as_category_level(&self) -> AttributionResult<Cow<'_, Snapshot>> {
        if self.is_category_level() {
            Ok(Cow::Borrowed(self))
        } else {
            self.to_category_snapshot().map(Cow::Owned)
        }
    }

    pub fn into_category_level(self) -> AttributionResult<Snapshot> {
        if self.is_category_level() {
            Ok(self)
        } else {
            self.to_category_snapshot()
        }
    }

    fn position_of(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }

    /// Weight of a category in a category-level snapshot.
    pub fn weight_of(&self, category: &str) -> Option<Weight> {
        self.position_of(category).map(|i| self.weights[i])
    }

    /// Return of a category in a category-level snapshot.
    pub fn return_of(&self, category: &str) -> Option<Rate> {
        self.position_of(category).map(|i| self.returns[i])
    }

    /// Reorder a category-level snapshot to `categories`.
    ///
    /// With `pad` set, categories absent here are inserted with zero weight
    /// and zero return. Without it, an absent category or one not listed in
    /// `categories` is a [`AttributionError::MissingCategory`].
    pub fn align_categories(
        &self,
        categories: &[String],
        pad: bool,
    ) -> AttributionResult<Snapshot> {
        let level = self.as_category_level()?;

        if !pad {
            if let Some(extra) = level
                .categories
                .iter()
                .find(|c| !categories.contains(*c))
            {
                return Err(AttributionError::MissingCategory {
                    category: extra.clone(),
                    period: format!(
                        "{} (absent from the reference category set)",
                        period_label(self.period)
                    ),
                });
            }
        }

        let mut weights = Vec::with_capacity(categories.len());
        let mut returns = Vec::with_capacity(categories.len());
        for cat in categories {
            match level.position_of(cat) {
                Some(i) => {
                    weights.push(level.weights[i]);
                    returns.push(level.returns[i]);
                }
                None if pad => {
                    weights.push(Decimal::ZERO);
                    returns.push(Decimal::ZERO);
                }
                None => {
                    return Err(AttributionError::MissingCategory {
                        category: cat.clone(),
                        period: period_label(self.period),
                    })
                }
            }
        }

        Ok(Snapshot {
            securities: categories.to_vec(),
            weights,
            returns,
            categories: categories.to_vec(),
            period: self.period,
        })
    }
}

pub(crate) fn period_label(period: Option<NaiveDate>) -> String {
    match period {
        Some(d) => d.to_string(),
        None => "single period".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holding(id: &str, w: Decimal, r: Decimal, cat: &str) -> Holding {
        Holding {
            security: id.into(),
            weight: w,
            return_: r,
            category: cat.into(),
        }
    }

    fn security_level() -> Snapshot {
        Snapshot::new(
            vec![
                holding("AAPL", dec!(0.30), dec!(0.12), "Tech"),
                holding("MSFT", dec!(0.30), dec!(0.08), "Tech"),
                holding("XOM", dec!(0.25), dec!(0.04), "Energy"),
                holding("CVX", dec!(0.15), dec!(0.06), "Energy"),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_total_return_and_weight() {
        let s = security_level();
        // 0.036 + 0.024 + 0.010 + 0.009
        assert_eq!(s.total_return().unwrap(), dec!(0.079));
        assert_eq!(s.total_weight().unwrap(), dec!(1.00));
    }

    #[test]
    fn test_unique_categories_keep_first_appearance_order() {
        let s = security_level();
        assert_eq!(s.unique_categories(), vec!["Tech".to_string(), "Energy".to_string()]);
        assert!(!s.is_category_level());
    }

    #[test]
    fn test_category_aggregates() {
        let s = security_level();
        let w = s.weights_by_category().unwrap();
        assert_eq!(w[0], ("Tech".to_string(), dec!(0.60)));
        assert_eq!(w[1], ("Energy".to_string(), dec!(0.40)));

        let r = s.returns_by_category().unwrap();
        // (0.036 + 0.024) / 0.60
        assert_eq!(r[0].1, dec!(0.10));
        // (0.010 + 0.009) / 0.40
        assert_eq!(r[1].1, dec!(0.0475));
    }

    #[test]
    fn test_to_category_snapshot_preserves_total_return() {
        let s = security_level();
        let c = s.to_category_snapshot().unwrap();
        assert!(c.is_category_level());
        assert_eq!(c.len(), 2);
        assert_eq!(c.total_return().unwrap(), s.total_return().unwrap());
        assert_eq!(c.weight_of("Tech"), Some(dec!(0.60)));
        assert_eq!(c.return_of("Energy"), Some(dec!(0.0475)));
        assert_eq!(c.return_of("Utilities"), None);
    }

    #[test]
    fn test_category_level_passes_through() {
        let s = Snapshot::new(
            vec![
                holding("A", dec!(0.6), dec!(0.10), "A"),
                holding("B", dec!(0.4), dec!(0.05), "B"),
            ],
            None,
        )
        .unwrap();
        assert!(matches!(s.as_category_level().unwrap(), Cow::Borrowed(_)));
        assert_eq!(s.clone().into_category_level().unwrap(), s);
    }

    #[test]
    fn test_zero_weight_return_forced_to_zero() {
        let s = Snapshot::new(
            vec![
                holding("A", dec!(1.0), dec!(0.05), "Core"),
                holding("GHOST", dec!(0), dec!(1000), "Core"),
                holding("ORPHAN", dec!(0), dec!(-0.99), "Satellite"),
            ],
            None,
        )
        .unwrap();
        assert_eq!(s.returns()[1], Decimal::ZERO);
        assert_eq!(s.total_return().unwrap(), dec!(0.05));
        let r = s.returns_by_category().unwrap();
        assert_eq!(r[0].1, dec!(0.05));
        // Zero-weight category
        assert_eq!(r[1].1, Decimal::ZERO);
    }

    #[test]
    fn test_aggregate_overflow_is_an_error() {
        let s = Snapshot::new(
            vec![
                holding("A", Decimal::MAX, dec!(2), "X"),
                holding("B", dec!(1), dec!(0.1), "X"),
            ],
            None,
        )
        .unwrap();
        assert!(matches!(
            s.total_return(),
            Err(AttributionError::ArithmeticOverflow { .. })
        ));
        assert!(matches!(
            s.returns_by_category(),
            Err(AttributionError::ArithmeticOverflow { .. })
        ));
        assert!(s.as_category_level().is_err());
    }

    #[test]
    fn test_with_period_stamps_date() {
        let d = NaiveDate::from_ymd_opt(2024, 9, 30);
        let s = security_level().with_period(d);
        assert_eq!(s.period(), d);
        assert_eq!(s.to_category_snapshot().unwrap().period(), d);
    }

    #[test]
    fn test_empty_snapshot_rejected() {
        assert!(matches!(
            Snapshot::new(vec![], None),
            Err(AttributionError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_duplicate_security_rejected() {
        let result = Snapshot::new(
            vec![
                holding("A", dec!(0.5), dec!(0.10), "X"),
                holding("A", dec!(0.5), dec!(0.05), "Y"),
            ],
            None,
        );
        assert!(matches!(result, Err(AttributionError::InvalidInput { .. })));
    }

    #[test]
    fn test_from_series_aligned() {
        let s = Snapshot::from_series(
            vec![("A".into(), dec!(0.5)), ("B".into(), dec!(0.5))],
            vec![("A".into(), dec!(0.02)), ("B".into(), dec!(0.04))],
            vec![("A".into(), "X".into()), ("B".into(), "Y".into())],
            NaiveDate::from_ymd_opt(2024, 1, 31),
        )
        .unwrap();
        assert_eq!(s.total_return().unwrap(), dec!(0.03));
        assert_eq!(s.period(), NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn test_from_series_length_mismatch() {
        let result = Snapshot::from_series(
            vec![("A".into(), dec!(0.5)), ("B".into(), dec!(0.5))],
            vec![("A".into(), dec!(0.02))],
            vec![("A".into(), "X".into()), ("B".into(), "Y".into())],
            None,
        );
        assert!(matches!(result, Err(AttributionError::InvalidInput { .. })));
    }

    #[test]
    fn test_from_series_order_mismatch() {
        let result = Snapshot::from_series(
            vec![("A".into(), dec!(0.5)), ("B".into(), dec!(0.5))],
            vec![("B".into(), dec!(0.04)), ("A".into(), dec!(0.02))],
            vec![("A".into(), "X".into()), ("B".into(), "Y".into())],
            None,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("position 0"));
    }

    #[test]
    fn test_align_categories_strict() {
        let s = security_level();
        let order = vec!["Energy".to_string(), "Tech".to_string()];
        let aligned = s.align_categories(&order, false).unwrap();
        assert_eq!(aligned.categories(), order.as_slice());
        assert_eq!(aligned.weights(), &[dec!(0.40), dec!(0.60)]);

        let missing = vec!["Tech".to_string(), "Energy".to_string(), "Utilities".to_string()];
        assert!(matches!(
            s.align_categories(&missing, false),
            Err(AttributionError::MissingCategory { ref category, .. }) if category == "Utilities"
        ));

        let fewer = vec!["Tech".to_string()];
        assert!(matches!(
            s.align_categories(&fewer, false),
            Err(AttributionError::MissingCategory { ref category, .. }) if category == "Energy"
        ));
    }

    #[test]
    fn test_align_categories_zero_pad() {
        let s = security_level();
        let union = vec!["Tech".to_string(), "Utilities".to_string(), "Energy".to_string()];
        let aligned = s.align_categories(&union, true).unwrap();
        assert_eq!(aligned.weight_of("Utilities"), Some(Decimal::ZERO));
        assert_eq!(aligned.return_of("Utilities"), Some(Decimal::ZERO));
        assert_eq!(aligned.total_return().unwrap(), s.total_return().unwrap());
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let json = r#"{"holdings":[
            {"security":"A","weight":"0.5","return":"0.1","category":"X"},
            {"security":"A","weight":"0.5","return":"0.2","category":"Y"}
        ]}"#;
        let parsed: Result<Snapshot, _> = serde_json::from_str(json);
        assert!(parsed.is_err());

        let ok = r#"{"holdings":[{"security":"A","weight":0,"return":"0.3","category":"X"}],"period":"2024-06-30"}"#;
        let s: Snapshot = serde_json::from_str(ok).unwrap();
        assert_eq!(s.returns()[0], Decimal::ZERO);
        assert_eq!(s.period(), NaiveDate::from_ymd_opt(2024, 6, 30));
    }
}
