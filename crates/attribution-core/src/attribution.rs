use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{AttributionConfig, CategoryReconciliation};
use crate::error::AttributionError;
use crate::linking::{EffectHistory, ReturnHistory};
use crate::single_period::{EffectTable, PeriodAttribution};
use crate::snapshot::{period_label, Snapshot};
use crate::types::{checked_sub, with_metadata, ComputationOutput, Effect, Rate, TOTAL_LABEL};
use crate::AttributionResult;

/// Residual above which the linked total is reported as diverging from the
/// compounded excess return.
const RESIDUAL_TOLERANCE: Decimal = dec!(0.0000000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodInput {
    pub period: NaiveDate,
    pub portfolio: Snapshot,
    pub benchmark: Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributionInput {
    SinglePeriod {
        portfolio: Snapshot,
        benchmark: Snapshot,
    },
    /// Periods in strictly ascending order.
    MultiPeriod { periods: Vec<PeriodInput> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReport {
    /// Linked multi-period effects (raw effects for a single period).
    pub summary: EffectTable,
    /// Raw, unlinked attribution of every period. Empty for single-period runs.
    pub periods: Vec<PeriodAttribution>,
    /// Compounded over all periods.
    pub portfolio_return: Rate,
    pub benchmark_return: Rate,
    pub excess_return: Rate,
    /// `excess_return` minus the summary total effect.
    pub residual: Effect,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Flag short positions and weight sums away from 1.0. Weights are never
/// required to sum to 1, so nothing here is an error.
fn check_weights(
    snapshot: &Snapshot,
    which: &str,
    tolerance: Decimal,
    warnings: &mut Vec<String>,
) -> AttributionResult<()> {
    let label = period_label(snapshot.period());
    let sum = snapshot.total_weight()?;
    if checked_sub(sum, Decimal::ONE, "weight check")?.abs() > tolerance {
        warnings.push(format!(
            "{} weights sum to {} in {} (outside {} of 1.0)",
            which, sum, label, tolerance
        ));
    }
    for (category, w) in snapshot.categories().iter().zip(snapshot.weights()) {
        if *w < Decimal::ZERO {
            warnings.push(format!(
                "Negative {} weight in category '{}' for {}: {} (short position)",
                which, category, label, w
            ));
        }
    }
    Ok(())
}

fn validate_period_order(periods: &[PeriodInput]) -> AttributionResult<()> {
    for pair in periods.windows(2) {
        if pair[1].period <= pair[0].period {
            return Err(AttributionError::invalid(
                "periods",
                format!(
                    "periods must be strictly ascending: {} follows {}",
                    pair[1].period, pair[0].period
                ),
            ));
        }
    }
    Ok(())
}

/// Date a snapshot with its period key; a snapshot already carrying a
/// different date is rejected.
fn stamp_period(snapshot: &Snapshot, which: &str, period: NaiveDate) -> AttributionResult<Snapshot> {
    match snapshot.period() {
        Some(own) if own != period => Err(AttributionError::invalid(
            which,
            format!("{} snapshot dated {} listed under period {}", which, own, period),
        )),
        _ => Ok(snapshot.clone().with_period(Some(period))),
    }
}

/// Categories every period is aligned to.
fn reference_categories(
    periods: &[(&Snapshot, &Snapshot)],
    policy: CategoryReconciliation,
) -> Vec<String> {
    match policy {
        CategoryReconciliation::Strict => periods
            .first()
            .map(|(p, _)| p.unique_categories())
            .unwrap_or_default(),
        CategoryReconciliation::ZeroPad => {
            let mut seen = HashSet::new();
            let mut union = Vec::new();
            for (p, b) in periods {
                for cat in p.unique_categories().into_iter().chain(b.unique_categories()) {
                    if seen.insert(cat.clone()) {
                        union.push(cat);
                    }
                }
            }
            union
        }
    }
}

/// Aggregate one side to category level and align it to `categories`.
fn prepare_side(
    snapshot: &Snapshot,
    which: &str,
    categories: &[String],
    config: &AttributionConfig,
    warnings: &mut Vec<String>,
) -> AttributionResult<Snapshot> {
    let pad = config.categories == CategoryReconciliation::ZeroPad;
    let level = snapshot.as_category_level()?;
    if pad {
        let present = level.categories();
        for cat in categories.iter().filter(|c| !present.contains(*c)) {
            warnings.push(format!(
                "Category '{}' absent from {} in {}; padded with zero weight and return",
                cat,
                which,
                period_label(snapshot.period())
            ));
        }
    }
    let aligned = level.align_categories(categories, pad)?;
    check_weights(&aligned, which, config.weight_tolerance, warnings)?;
    Ok(aligned)
}

fn prepare_period(
    portfolio: &Snapshot,
    benchmark: &Snapshot,
    categories: &[String],
    config: &AttributionConfig,
    warnings: &mut Vec<String>,
) -> AttributionResult<(Snapshot, Snapshot)> {
    Ok((
        prepare_side(portfolio, "portfolio", categories, config, warnings)?,
        prepare_side(benchmark, "benchmark", categories, config, warnings)?,
    ))
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

fn run_single(
    portfolio: &Snapshot,
    benchmark: &Snapshot,
    config: &AttributionConfig,
    warnings: &mut Vec<String>,
) -> AttributionResult<AttributionReport> {
    let categories = reference_categories(&[(portfolio, benchmark)], config.categories);
    let (p, b) = prepare_period(portfolio, benchmark, &categories, config, warnings)?;
    let single = config.single_period.decompose(&p, &b)?;

    Ok(AttributionReport {
        residual: checked_sub(single.excess_return, single.effects.total.total, "residual")?,
        portfolio_return: single.portfolio_return,
        benchmark_return: single.benchmark_return,
        excess_return: single.excess_return,
        summary: single.effects,
        periods: Vec::new(),
    })
}

fn run_multi(
    periods: &[PeriodInput],
    config: &AttributionConfig,
    warnings: &mut Vec<String>,
) -> AttributionResult<AttributionReport> {
    if periods.is_empty() {
        return Err(AttributionError::InsufficientData(
            "multi-period attribution requires at least one period".into(),
        ));
    }
    validate_period_order(periods)?;

    let dated = periods
        .iter()
        .map(|p| {
            Ok((
                p.period,
                stamp_period(&p.portfolio, "portfolio", p.period)?,
                stamp_period(&p.benchmark, "benchmark", p.period)?,
            ))
        })
        .collect::<AttributionResult<Vec<_>>>()?;
    let pairs: Vec<(&Snapshot, &Snapshot)> = dated.iter().map(|(_, p, b)| (p, b)).collect();
    let categories = reference_categories(&pairs, config.categories);

    // Owned by this run only.
    let mut returns = ReturnHistory::default();
    let mut total_history = EffectHistory::default();
    let mut category_history: HashMap<String, EffectHistory> = categories
        .iter()
        .map(|c| (c.clone(), EffectHistory::default()))
        .collect();
    let mut period_results = Vec::with_capacity(periods.len());

    for (period, portfolio, benchmark) in &dated {
        let (p, b) = prepare_period(portfolio, benchmark, &categories, config, warnings)?;
        let single = config.single_period.decompose(&p, &b)?;

        let (rp, rb) = (single.portfolio_return, single.benchmark_return);
        for cat in &categories {
            let missing = || AttributionError::MissingCategory {
                category: cat.clone(),
                period: period.to_string(),
            };
            let raw = single.effects.row(cat).ok_or_else(missing)?;
            let history = category_history.get_mut(cat).ok_or_else(missing)?;
            history.link_period(config.linking, raw, &returns, rp, rb)?;
        }
        total_history.link_period(config.linking, &single.effects.total, &returns, rp, rb)?;

        // Only after every series of this period has been linked.
        returns.push(rp, rb);

        debug!(
            period = %period,
            portfolio_return = %rp,
            benchmark_return = %rb,
            "period linked"
        );
        period_results.push(single);
    }

    let rows = categories
        .iter()
        .map(|c| {
            category_history
                .get(c)
                .ok_or_else(|| AttributionError::MissingCategory {
                    category: c.clone(),
                    period: "summary".into(),
                })
                .and_then(|h| h.summarize(c.clone()))
        })
        .collect::<AttributionResult<Vec<_>>>()?;
    let summary = EffectTable {
        categories: rows,
        total: total_history.summarize(TOTAL_LABEL)?,
    };

    let portfolio_return = returns.cumulative_portfolio()?;
    let benchmark_return = returns.cumulative_benchmark()?;
    let excess_return = checked_sub(portfolio_return, benchmark_return, "excess return")?;

    Ok(AttributionReport {
        residual: checked_sub(excess_return, summary.total.total, "residual")?,
        summary,
        periods: period_results,
        portfolio_return,
        benchmark_return,
        excess_return,
    })
}

/// Run Brinson-Fachler attribution over one or more periods.
///
/// Multi-period inputs are decomposed period by period in chronological
/// order and linked with the configured linking method; the summary row of
/// each category is the sum of its linked effects. A single-period input is
/// returned as decomposed, without linking.
pub fn run_attribution(
    input: &AttributionInput,
    config: &AttributionConfig,
) -> AttributionResult<ComputationOutput<AttributionReport>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let report = match input {
        AttributionInput::SinglePeriod {
            portfolio,
            benchmark,
        } => run_single(portfolio, benchmark, config, &mut warnings)?,
        AttributionInput::MultiPeriod { periods } => run_multi(periods, config, &mut warnings)?,
    };

    if report.residual.abs() > RESIDUAL_TOLERANCE {
        warnings.push(format!(
            "Total effect differs from excess return by {} (portfolio and benchmark weights sum to different totals)",
            report.residual
        ));
    }
    for w in &warnings {
        warn!("{}", w);
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &config.methodology(),
        &config.assumptions(),
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
