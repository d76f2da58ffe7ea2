use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AttributionError;
use crate::single_period::EffectRow;
use crate::types::{
    checked_add, checked_mul, checked_sub, checked_sum, growth_factor, Effect, Rate,
};
use crate::AttributionResult;

// ---------------------------------------------------------------------------
// Modified Frongello
// ---------------------------------------------------------------------------

/// Modified Frongello linking of one effect at period T.
///
/// ```text
/// linked(T) = raw * 0.5 * (Π(1 + Rp_t) + Π(1 + Rb_t))
///           + 0.5 * (Rp_T + Rb_T) * Σ linked_t          for t = 1..T-1
/// ```
///
/// `prior_portfolio`, `prior_benchmark` and `prior_linked` cover periods
/// 1..T-1 in chronological order and must have equal lengths. For T = 1 they
/// are empty and the raw effect comes back unchanged.
pub fn modified_frongello(
    raw: Effect,
    prior_portfolio: &[Rate],
    prior_benchmark: &[Rate],
    portfolio_return: Rate,
    benchmark_return: Rate,
    prior_linked: &[Effect],
) -> AttributionResult<Effect> {
    if prior_portfolio.len() != prior_benchmark.len() {
        return Err(AttributionError::UndefinedReturn {
            context: format!(
                "{} prior portfolio returns but {} prior benchmark returns",
                prior_portfolio.len(),
                prior_benchmark.len()
            ),
        });
    }
    if prior_linked.len() != prior_portfolio.len() {
        return Err(AttributionError::UndefinedReturn {
            context: format!(
                "{} prior linked effects for {} prior periods",
                prior_linked.len(),
                prior_portfolio.len()
            ),
        });
    }

    let half = dec!(0.5);
    let growth = checked_add(
        growth_factor(prior_portfolio, "portfolio growth")?,
        growth_factor(prior_benchmark, "benchmark growth")?,
        "linking growth",
    )?;
    let linked_so_far = checked_sum(prior_linked.iter().copied(), "prior linked effects")?;
    let scaled = checked_mul(checked_mul(raw, half, "linked effect")?, growth, "linked effect")?;
    let carry = checked_mul(
        checked_mul(
            half,
            checked_add(portfolio_return, benchmark_return, "period returns")?,
            "linked effect",
        )?,
        linked_so_far,
        "linked effect",
    )?;
    checked_add(scaled, carry, "linked effect")
}

/// Multi-period linking algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkingMethod {
    #[default]
    ModifiedFrongello,
}

impl LinkingMethod {
    pub fn link(
        &self,
        raw: Effect,
        returns: &ReturnHistory,
        portfolio_return: Rate,
        benchmark_return: Rate,
        prior_linked: &[Effect],
    ) -> AttributionResult<Effect> {
        match self {
            LinkingMethod::ModifiedFrongello => modified_frongello(
                raw,
                &returns.portfolio,
                &returns.benchmark,
                portfolio_return,
                benchmark_return,
                prior_linked,
            ),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LinkingMethod::ModifiedFrongello => "Modified Frongello",
        }
    }
}

// ---------------------------------------------------------------------------
// Histories
// ---------------------------------------------------------------------------

/// Portfolio and benchmark total returns of every processed period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnHistory {
    portfolio: Vec<Rate>,
    benchmark: Vec<Rate>,
}

impl ReturnHistory {
    pub fn push(&mut self, portfolio_return: Rate, benchmark_return: Rate) {
        self.portfolio.push(portfolio_return);
        self.benchmark.push(benchmark_return);
    }

    pub fn len(&self) -> usize {
        self.portfolio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolio.is_empty()
    }

    pub fn portfolio(&self) -> &[Rate] {
        &self.portfolio
    }

    pub fn benchmark(&self) -> &[Rate] {
        &self.benchmark
    }

    /// Π(1 + Rp_t) - 1 over all processed periods.
    pub fn cumulative_portfolio(&self) -> AttributionResult<Rate> {
        compound(&self.portfolio, "cumulative portfolio return")
    }

    pub fn cumulative_benchmark(&self) -> AttributionResult<Rate> {
        compound(&self.benchmark, "cumulative benchmark return")
    }
}

fn compound(rets: &[Rate], context: &str) -> AttributionResult<Rate> {
    checked_sub(growth_factor(rets, context)?, Decimal::ONE, context)
}

/// Linked allocation, selection+interaction and total effects of one
/// category (or of the total), one entry per processed period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectHistory {
    allocation: Vec<Effect>,
    selection_interaction: Vec<Effect>,
    total: Vec<Effect>,
}

impl EffectHistory {
    /// Link this period's raw effects and append them.
    ///
    /// `returns` must hold periods 1..T-1 only; push period T's returns
    /// after every series has been linked.
    pub fn link_period(
        &mut self,
        method: LinkingMethod,
        raw: &EffectRow,
        returns: &ReturnHistory,
        portfolio_return: Rate,
        benchmark_return: Rate,
    ) -> AttributionResult<()> {
        let allocation = method.link(
            raw.allocation,
            returns,
            portfolio_return,
            benchmark_return,
            &self.allocation,
        )?;
        let selection_interaction = method.link(
            raw.selection_interaction,
            returns,
            portfolio_return,
            benchmark_return,
            &self.selection_interaction,
        )?;
        let total = method.link(
            raw.total,
            returns,
            portfolio_return,
            benchmark_return,
            &self.total,
        )?;

        self.allocation.push(allocation);
        self.selection_interaction.push(selection_interaction);
        self.total.push(total);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    pub fn allocation(&self) -> &[Effect] {
        &self.allocation
    }

    pub fn selection_interaction(&self) -> &[Effect] {
        &self.selection_interaction
    }

    pub fn total(&self) -> &[Effect] {
        &self.total
    }

    /// Multi-period effect: the sum of every linked entry.
    pub fn summarize(&self, category: impl Into<String>) -> AttributionResult<EffectRow> {
        Ok(EffectRow {
            category: category.into(),
            allocation: checked_sum(self.allocation.iter().copied(), "linked allocation")?,
            selection_interaction: checked_sum(
                self.selection_interaction.iter().copied(),
                "linked selection",
            )?,
            total: checked_sum(self.total.iter().copied(), "linked total")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
