use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AttributionError;
use crate::snapshot::{period_label, Snapshot};
use crate::types::{
    checked_add, checked_mul, checked_sub, checked_sum, Effect, Rate, TOTAL_LABEL,
};
use crate::AttributionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Attribution effects of one category, or of the whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRow {
    pub category: String,
    pub allocation: Effect,
    pub selection_interaction: Effect,
    pub total: Effect,
}

impl EffectRow {
    pub fn new(
        category: impl Into<String>,
        allocation: Effect,
        selection_interaction: Effect,
    ) -> AttributionResult<Self> {
        let category = category.into();
        let total = checked_add(allocation, selection_interaction, &category)?;
        Ok(EffectRow {
            category,
            allocation,
            selection_interaction,
            total,
        })
    }

    pub fn zero(category: impl Into<String>) -> Self {
        EffectRow {
            category: category.into(),
            allocation: Decimal::ZERO,
            selection_interaction: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// One row per category followed by the `Total` row.
///
/// Serializes as a flat list of rows, `Total` last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<EffectRow>", try_from = "Vec<EffectRow>")]
pub struct EffectTable {
    pub categories: Vec<EffectRow>,
    pub total: EffectRow,
}

impl EffectTable {
    /// Sum the category rows into a `Total` row.
    pub fn from_categories(categories: Vec<EffectRow>) -> AttributionResult<Self> {
        let allocation = checked_sum(categories.iter().map(|r| r.allocation), "total allocation")?;
        let selection_interaction = checked_sum(
            categories.iter().map(|r| r.selection_interaction),
            "total selection",
        )?;
        let total = checked_sum(categories.iter().map(|r| r.total), "total effect")?;
        Ok(EffectTable {
            categories,
            total: EffectRow {
                category: TOTAL_LABEL.to_string(),
                allocation,
                selection_interaction,
                total,
            },
        })
    }

    pub fn row(&self, category: &str) -> Option<&EffectRow> {
        self.categories.iter().find(|r| r.category == category)
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|r| r.category.as_str()).collect()
    }

    /// Category rows then the `Total` row.
    pub fn rows(&self) -> impl Iterator<Item = &EffectRow> {
        self.categories.iter().chain(std::iter::once(&self.total))
    }
}

impl From<EffectTable> for Vec<EffectRow> {
    fn from(table: EffectTable) -> Self {
        let mut rows = table.categories;
        rows.push(table.total);
        rows
    }
}

impl TryFrom<Vec<EffectRow>> for EffectTable {
    type Error = AttributionError;

    fn try_from(mut rows: Vec<EffectRow>) -> Result<Self, Self::Error> {
        match rows.pop() {
            Some(total) if total.category == TOTAL_LABEL => Ok(EffectTable {
                categories: rows,
                total,
            }),
            _ => Err(AttributionError::invalid(
                "effects",
                format!("effect table must end with a '{}' row", TOTAL_LABEL),
            )),
        }
    }
}

/// Raw (unlinked) attribution of a single period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAttribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<NaiveDate>,
    pub portfolio_return: Rate,
    pub benchmark_return: Rate,
    pub excess_return: Rate,
    pub effects: EffectTable,
}

/// Single-period decomposition models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinglePeriodMethod {
    /// Brinson-Fachler, top-down: interaction folded into selection.
    #[default]
    BrinsonTopDown,
}

impl SinglePeriodMethod {
    pub fn decompose(
        &self,
        portfolio: &Snapshot,
        benchmark: &Snapshot,
    ) -> AttributionResult<PeriodAttribution> {
        match self {
            SinglePeriodMethod::BrinsonTopDown => brinson_topdown(portfolio, benchmark),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SinglePeriodMethod::BrinsonTopDown => "Brinson-Fachler (top-down)",
        }
    }
}

// ---------------------------------------------------------------------------
// Brinson-Fachler, top-down
// ---------------------------------------------------------------------------

/// Single-period Brinson-Fachler attribution, top-down.
///
/// For each category c, with `R_B` the benchmark total return:
///
/// ```text
/// allocation(c)            = (wP(c) - wB(c)) * (rB(c) - R_B)
/// selection_interaction(c) = wP(c) * (rP(c) - rB(c))
/// total(c)                 = allocation(c) + selection_interaction(c)
/// ```
///
/// Security-level snapshots are aggregated to category level first. Both
/// snapshots must carry the same category set; rows follow the portfolio's
/// category order.
pub fn brinson_topdown(
    portfolio: &Snapshot,
    benchmark: &Snapshot,
) -> AttributionResult<PeriodAttribution> {
    let portfolio = portfolio.as_category_level()?;
    let benchmark = benchmark.as_category_level()?;
    let period = portfolio.period().or(benchmark.period());

    if let Some(extra) = benchmark
        .categories()
        .iter()
        .find(|c| portfolio.weight_of(c).is_none())
    {
        return Err(AttributionError::MissingCategory {
            category: extra.clone(),
            period: format!("{} (absent from portfolio)", period_label(period)),
        });
    }

    let benchmark_total = benchmark.total_return()?;

    let mut rows = Vec::with_capacity(portfolio.len());
    for (i, category) in portfolio.categories().iter().enumerate() {
        let wp = portfolio.weights()[i];
        let rp = portfolio.returns()[i];
        let (wb, rb) = match (benchmark.weight_of(category), benchmark.return_of(category)) {
            (Some(w), Some(r)) => (w, r),
            _ => {
                return Err(AttributionError::MissingCategory {
                    category: category.clone(),
                    period: format!("{} (absent from benchmark)", period_label(period)),
                })
            }
        };

        let allocation = checked_mul(
            checked_sub(wp, wb, "active weight")?,
            checked_sub(rb, benchmark_total, "relative benchmark return")?,
            "allocation",
        )?;
        let selection_interaction =
            checked_mul(wp, checked_sub(rp, rb, "active return")?, "selection")?;
        rows.push(EffectRow::new(category.clone(), allocation, selection_interaction)?);
    }

    let portfolio_return = portfolio.total_return()?;
    Ok(PeriodAttribution {
        period,
        portfolio_return,
        benchmark_return: benchmark_total,
        excess_return: checked_sub(portfolio_return, benchmark_total, "excess return")?,
        effects: EffectTable::from_categories(rows)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
