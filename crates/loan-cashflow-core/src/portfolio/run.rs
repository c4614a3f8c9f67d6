//! Pool-level projection: every loan under one scenario, then aggregated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortisation::ProfileCache;
use crate::cashflow::{generate_cashflows, CashFlowPeriod, CashFlowSummary, CashFlowTable};
use crate::error::LoanCashflowError;
use crate::loan::{AmortisationType, AmortisationVectors, Loan};
use crate::portfolio::aggregate::aggregate;
use crate::scenario::Scenario;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::wal::weighted_average_life;
use crate::LoanCashflowResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub vectors: AmortisationVectors,
    #[serde(default)]
    pub scenario: Scenario,
}

/// Headline figures for one loan within a pool run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSummaryRow {
    pub loan_id: String,
    pub amortisation_type: AmortisationType,
    pub orig_balance: Money,
    pub num_periods: u32,
    pub wal_years: Years,
    pub total_principal_collected: Money,
    pub total_interest: Money,
    pub total_losses: Money,
    pub total_recoveries: Money,
    pub pool_factor_at_end: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOutput {
    pub num_loans: usize,
    pub total_original_balance: Money,
    pub wal_years: Years,
    pub summary: CashFlowSummary,
    pub loans: Vec<LoanSummaryRow>,
    pub periods: Vec<CashFlowPeriod>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project every loan in the pool, aggregate by period and compute the pool
/// WAL against the total original balance.
pub fn run_portfolio(
    input: &PortfolioInput,
) -> LoanCashflowResult<ComputationOutput<PortfolioOutput>> {
    let start = Instant::now();

    validate_pool(&input.loans)?;
    input.scenario.validate()?;

    let mut cache = ProfileCache::new();
    cache.warm(&input.loans, &input.vectors)?;
    let tables = generate_pool(&input.loans, &cache, &input.scenario)?;

    let loans = input
        .loans
        .iter()
        .zip(&tables)
        .map(|(loan, table)| loan_row(loan, table))
        .collect::<LoanCashflowResult<Vec<_>>>()?;

    let pool = aggregate(&tables);
    let total_original_balance = total_balance(&input.loans);
    let wal_years = weighted_average_life(&pool, total_original_balance)?;
    let summary = pool.summary(total_original_balance);
    let warnings = pool_warnings(&input.loans, &loans, &summary);

    debug!(
        loans = input.loans.len(),
        periods = pool.len(),
        wal_years = %wal_years,
        "portfolio run complete"
    );

    let output = PortfolioOutput {
        num_loans: input.loans.len(),
        total_original_balance,
        wal_years,
        summary,
        loans,
        periods: pool.periods,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio cash flow aggregation — per-loan CPR/CDR projections summed by period",
        &input.scenario,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Shared with the scenario sweep
// ---------------------------------------------------------------------------

pub(crate) fn validate_pool(loans: &[Loan]) -> LoanCashflowResult<()> {
    if loans.is_empty() {
        return Err(LoanCashflowError::InsufficientData(
            "Portfolio must contain at least one loan".into(),
        ));
    }
    Ok(())
}

pub(crate) fn total_balance(loans: &[Loan]) -> Money {
    loans.iter().map(|l| l.orig_balance).sum()
}

/// Generate one table per loan, in loan order. Profiles must already be in
/// `cache`.
pub(crate) fn generate_pool(
    loans: &[Loan],
    cache: &ProfileCache,
    scenario: &Scenario,
) -> LoanCashflowResult<Vec<CashFlowTable>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        loans
            .par_iter()
            .map(|loan| generate_one(loan, cache, scenario))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        loans
            .iter()
            .map(|loan| generate_one(loan, cache, scenario))
            .collect()
    }
}

fn generate_one(
    loan: &Loan,
    cache: &ProfileCache,
    scenario: &Scenario,
) -> LoanCashflowResult<CashFlowTable> {
    let profile = cache.get(&loan.loan_id).ok_or_else(|| {
        LoanCashflowError::InsufficientData(format!(
            "No scheduled profile built for loan {}",
            loan.loan_id
        ))
    })?;
    generate_cashflows(loan, profile, scenario)
}

fn loan_row(loan: &Loan, table: &CashFlowTable) -> LoanCashflowResult<LoanSummaryRow> {
    let summary = table.summary(loan.orig_balance);
    Ok(LoanSummaryRow {
        loan_id: loan.loan_id.clone(),
        amortisation_type: loan.amortisation.kind(),
        orig_balance: loan.orig_balance,
        num_periods: summary.num_periods,
        wal_years: weighted_average_life(table, loan.orig_balance)?,
        total_principal_collected: summary.total_principal_collected,
        total_interest: summary.total_interest,
        total_losses: summary.total_losses,
        total_recoveries: summary.total_recoveries,
        pool_factor_at_end: summary.pool_factor_at_end,
    })
}

fn pool_warnings(loans: &[Loan], rows: &[LoanSummaryRow], summary: &CashFlowSummary) -> Vec<String> {
    let mut warnings = Vec::new();

    let early = loans
        .iter()
        .zip(rows)
        .filter(|(loan, row)| row.num_periods < loan.term)
        .count();
    if early > 0 {
        warnings.push(format!("{early} of {} loans paid down before term", loans.len()));
    }

    if summary.unrecognised_loss > Decimal::ZERO || summary.unrecognised_recovery > Decimal::ZERO {
        warnings.push(format!(
            "Loss {} and recovery {} fall after the last period of their loans and are not in the pool table",
            summary.unrecognised_loss, summary.unrecognised_recovery
        ));
    }
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
