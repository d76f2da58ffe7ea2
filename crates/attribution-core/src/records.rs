//! Merged portfolio/benchmark rows, one per security per period, turned
//! into [`AttributionInput`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::attribution::{AttributionInput, PeriodInput};
use crate::config::MissingValuePolicy;
use crate::error::AttributionError;
use crate::snapshot::{period_label, Holding, Snapshot};
use crate::AttributionResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributionRecord {
    #[serde(default)]
    pub period: Option<NaiveDate>,
    #[serde(default)]
    pub security: Option<String>,
    pub category: String,
    #[serde(default)]
    pub portfolio_weight: Option<Decimal>,
    #[serde(default)]
    pub portfolio_return: Option<Decimal>,
    #[serde(default)]
    pub benchmark_weight: Option<Decimal>,
    #[serde(default)]
    pub benchmark_return: Option<Decimal>,
}

enum Field {
    Weight,
    Return,
}

fn resolve(
    value: Option<Decimal>,
    kind: Field,
    name: &str,
    security: &str,
    period: Option<NaiveDate>,
    policy: MissingValuePolicy,
) -> AttributionResult<Decimal> {
    match (value, policy) {
        (Some(v), _) => Ok(v),
        (None, MissingValuePolicy::TreatAsZero) => Ok(Decimal::ZERO),
        (None, MissingValuePolicy::Error) => {
            let context = format!(
                "{} missing for security '{}' in {}",
                name,
                security,
                period_label(period)
            );
            Err(match kind {
                Field::Weight => AttributionError::invalid(name, context),
                Field::Return => AttributionError::UndefinedReturn { context },
            })
        }
    }
}

/// Build portfolio and benchmark snapshots over the same security index.
fn build_pair(
    rows: &[&AttributionRecord],
    period: Option<NaiveDate>,
    policy: MissingValuePolicy,
) -> AttributionResult<(Snapshot, Snapshot)> {
    let mut portfolio = Vec::with_capacity(rows.len());
    let mut benchmark = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let security = row.security.clone().unwrap_or_else(|| format!("#{}", i));
        let field = |v, kind, name| resolve(v, kind, name, &security, period, policy);

        portfolio.push(Holding {
            security: security.clone(),
            weight: field(row.portfolio_weight, Field::Weight, "portfolio_weight")?,
            return_: field(row.portfolio_return, Field::Return, "portfolio_return")?,
            category: row.category.clone(),
        });
        benchmark.push(Holding {
            security: security.clone(),
            weight: field(row.benchmark_weight, Field::Weight, "benchmark_weight")?,
            return_: field(row.benchmark_return, Field::Return, "benchmark_return")?,
            category: row.category.clone(),
        });
    }

    Ok((Snapshot::new(portfolio, period)?, Snapshot::new(benchmark, period)?))
}

/// Group records by period and build the attribution input.
///
/// More than one distinct period gives a multi-period input with periods in
/// ascending order; otherwise a single-period input.
pub fn build_input(
    records: &[AttributionRecord],
    policy: MissingValuePolicy,
) -> AttributionResult<AttributionInput> {
    if records.is_empty() {
        return Err(AttributionError::InsufficientData(
            "no attribution records supplied".into(),
        ));
    }

    let dated = records.iter().filter(|r| r.period.is_some()).count();
    if dated != 0 && dated != records.len() {
        return Err(AttributionError::invalid(
            "period",
            format!(
                "{} of {} records carry a period; either all or none must",
                dated,
                records.len()
            ),
        ));
    }

    let mut by_period: BTreeMap<Option<NaiveDate>, Vec<&AttributionRecord>> = BTreeMap::new();
    for r in records {
        by_period.entry(r.period).or_default().push(r);
    }

    if by_period.len() == 1 {
        let (period, rows) = by_period
            .into_iter()
            .next()
            .ok_or_else(|| AttributionError::InsufficientData("no periods".into()))?;
        let (portfolio, benchmark) = build_pair(&rows, period, policy)?;
        return Ok(AttributionInput::SinglePeriod {
            portfolio,
            benchmark,
        });
    }

    let mut periods = Vec::with_capacity(by_period.len());
    for (period, rows) in by_period {
        let date = period.ok_or_else(|| AttributionError::invalid("period", "missing period"))?;
        let (portfolio, benchmark) = build_pair(&rows, period, policy)?;
        periods.push(PeriodInput {
            period: date,
            portfolio,
            benchmark,
        });
    }
    Ok(AttributionInput::MultiPeriod { periods })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(
        period: Option<NaiveDate>,
        security: &str,
        category: &str,
        pw: Decimal,
        pr: Decimal,
        bw: Decimal,
        br: Decimal,
    ) -> AttributionRecord {
        AttributionRecord {
            period,
            security: Some(security.into()),
            category: category.into(),
            portfolio_weight: Some(pw),
            portfolio_return: Some(pr),
            benchmark_weight: Some(bw),
            benchmark_return: Some(br),
        }
    }

    fn d(m: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2023, m, 30)
    }

    #[test]
    fn test_undated_records_build_single_period() {
        let records = vec![
            rec(None, "X1", "Tech", dec!(0.3), dec!(0.12), dec!(0.25), dec!(0.10)),
            rec(None, "X2", "Tech", dec!(0.3), dec!(0.08), dec!(0.25), dec!(0.06)),
            rec(None, "Y1", "Energy", dec!(0.4), dec!(0.05), dec!(0.50), dec!(0.06)),
        ];
        match build_input(&records, MissingValuePolicy::Error).unwrap() {
            AttributionInput::SinglePeriod {
                portfolio,
                benchmark,
            } => {
                assert_eq!(portfolio.len(), 3);
                assert_eq!(portfolio.total_weight().unwrap(), dec!(1.0));
                assert_eq!(benchmark.returns()[2], dec!(0.06));
                assert!(!portfolio.is_category_level());
            }
            other => panic!("expected single period, got {:?}", other),
        }
    }

    #[test]
    fn test_dated_records_sorted_into_periods() {
        let records = vec![
            rec(d(6), "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01)),
            rec(d(4), "A", "A", dec!(1), dec!(0.03), dec!(1), dec!(0.02)),
            rec(d(9), "A", "A", dec!(1), dec!(0.01), dec!(1), dec!(0.01)),
        ];
        match build_input(&records, MissingValuePolicy::Error).unwrap() {
            AttributionInput::MultiPeriod { periods } => {
                let dates: Vec<_> = periods.iter().map(|p| Some(p.period)).collect();
                assert_eq!(dates, vec![d(4), d(6), d(9)]);
                assert_eq!(periods[0].portfolio.total_return().unwrap(), dec!(0.03));
            }
            other => panic!("expected multi period, got {:?}", other),
        }
    }

    #[test]
    fn test_single_dated_period_is_single_period() {
        let records = vec![rec(d(3), "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01))];
        let input = build_input(&records, MissingValuePolicy::Error).unwrap();
        assert!(matches!(input, AttributionInput::SinglePeriod { ref portfolio, .. } if portfolio.period() == d(3)));
    }

    #[test]
    fn test_missing_return_is_undefined_return_error() {
        let mut r = rec(None, "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01));
        r.benchmark_return = None;
        let err = build_input(&[r], MissingValuePolicy::Error).unwrap_err();
        assert!(matches!(err, AttributionError::UndefinedReturn { .. }));
        assert!(err.to_string().contains("benchmark_return"));
    }

    #[test]
    fn test_missing_weight_is_invalid_input() {
        let mut r = rec(None, "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01));
        r.portfolio_weight = None;
        let err = build_input(&[r], MissingValuePolicy::Error).unwrap_err();
        assert!(matches!(err, AttributionError::InvalidInput { .. }));
    }

    #[test]
    fn test_missing_values_treated_as_zero() {
        let mut r = rec(None, "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01));
        r.portfolio_return = None;
        let second = AttributionRecord {
            security: None,
            category: "B".into(),
            portfolio_weight: None,
            benchmark_weight: Some(dec!(0)),
            ..AttributionRecord::default()
        };
        let input = build_input(&[r, second], MissingValuePolicy::TreatAsZero).unwrap();
        match input {
            AttributionInput::SinglePeriod { portfolio, .. } => {
                assert_eq!(portfolio.total_return().unwrap(), Decimal::ZERO);
                assert_eq!(portfolio.securities()[1], "#1");
            }
            other => panic!("expected single period, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_dated_and_undated_rejected() {
        let records = vec![
            rec(d(1), "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01)),
            rec(None, "A", "A", dec!(1), dec!(0.02), dec!(1), dec!(0.01)),
        ];
        assert!(matches!(
            build_input(&records, MissingValuePolicy::Error),
            Err(AttributionError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_empty_records_rejected() {
        assert!(build_input(&[], MissingValuePolicy::Error).is_err());
    }
}
