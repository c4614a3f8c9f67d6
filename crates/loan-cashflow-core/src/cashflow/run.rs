//! Single-loan entry points: validate, profile, project, summarise.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortisation::scheduled_profile;
use crate::cashflow::engine::generate_cashflows;
use crate::cashflow::table::{CashFlowPeriod, CashFlowSummary, CashFlowTable};
use crate::loan::{AmortisationType, AmortisationVectors, Loan};
use crate::scenario::Scenario;
use crate::types::{with_metadata, ComputationOutput, Money, Years};
use crate::wal::weighted_average_life;
use crate::LoanCashflowResult;

/// Input for a single-loan projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLoanInput {
    pub loan: Loan,
    /// Only needed for vector-amortised loans.
    #[serde(default)]
    pub vectors: AmortisationVectors,
    #[serde(default)]
    pub scenario: Scenario,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanCashflowOutput {
    pub loan_id: String,
    pub amortisation_type: AmortisationType,
    pub orig_balance: Money,
    pub periods: Vec<CashFlowPeriod>,
    pub summary: CashFlowSummary,
    pub wal_years: Years,
}

/// Project one loan under its scenario and report WAL against the loan's
/// original balance.
pub fn run_loan(input: &RunLoanInput) -> LoanCashflowResult<ComputationOutput<LoanCashflowOutput>> {
    let start = Instant::now();
    let loan = &input.loan;

    input.scenario.validate()?;
    let profile = scheduled_profile(loan, &input.vectors)?;
    let table = generate_cashflows(loan, &profile, &input.scenario)?;

    let output = loan_output(loan, table)?;
    let warnings = loan_warnings(loan, &output);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan cash flow projection — scheduled amortisation with CPR/CDR/recovery-lag waterfall",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// The loan's cash flows with no defaults and no prepayments.
pub fn scheduled_cashflows(
    loan: &Loan,
    vectors: &AmortisationVectors,
) -> LoanCashflowResult<ComputationOutput<LoanCashflowOutput>> {
    run_loan(&RunLoanInput {
        loan: loan.clone(),
        vectors: vectors.clone(),
        scenario: Scenario::zero(),
    })
}

fn loan_output(loan: &Loan, table: CashFlowTable) -> LoanCashflowResult<LoanCashflowOutput> {
    let wal_years = weighted_average_life(&table, loan.orig_balance)?;
    let summary = table.summary(loan.orig_balance);
    Ok(LoanCashflowOutput {
        loan_id: loan.loan_id.clone(),
        amortisation_type: loan.amortisation.kind(),
        orig_balance: loan.orig_balance,
        periods: table.periods,
        summary,
        wal_years,
    })
}

fn loan_warnings(loan: &Loan, output: &LoanCashflowOutput) -> Vec<String> {
    let summary = &output.summary;
    let mut warnings = Vec::new();
    if summary.num_periods < loan.term {
        let residual = output
            .periods
            .last()
            .map(|row| row.end_bal)
            .unwrap_or(loan.orig_balance);
        if residual.is_zero() {
            warnings.push(format!(
                "Loan {}: balance fully paid down at period {} of {}",
                loan.loan_id, summary.num_periods, loan.term
            ));
        } else {
            warnings.push(format!(
                "Loan {}: projection stopped at period {} of {} with {} (under half a cent) outstanding",
                loan.loan_id, summary.num_periods, loan.term, residual
            ));
        }
    }
    if !summary.unrecognised_loss.is_zero() || !summary.unrecognised_recovery.is_zero() {
        warnings.push(format!(
            "Loan {}: loss {} and recovery {} fall after the last period and are not in the table",
            loan.loan_id, summary.unrecognised_loss, summary.unrecognised_recovery
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_run_bullet_loan() {
        let input = RunLoanInput {
            loan: Loan::bullet("1", dec!(1_000_000), dec!(0.05), 120).unwrap(),
            vectors: AmortisationVectors::new(),
            scenario: Scenario::zero(),
        };
        let result = run_loan(&input).unwrap();
        let out = &result.result;

        assert_eq!(out.periods.len(), 120);
        assert_eq!(out.wal_years, dec!(10));
        assert_eq!(out.summary.total_principal_collected, dec!(1_000_000));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_run_from_json() {
        let json = r#"{
            "loan": {
                "loan_id": 1,
                "orig_balance": "100000",
                "coupon": "0.06",
                "term": 4,
                "amortisation_type": "vector",
                "vector_id": "v"
            },
            "vectors": { "v": ["25000", "25000", "25000", "25000"] },
            "scenario": { "cdr": "0.10", "recovery": "0.5", "recovery_lag": 2 }
        }"#;
        let input: RunLoanInput = serde_json::from_str(json).unwrap();
        let result = run_loan(&input).unwrap();
        assert_eq!(result.result.periods.len(), 4);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("after the last period")));
    }

    #[test]
    fn test_early_payoff_warning() {
        let mut vectors = AmortisationVectors::new();
        vectors.insert("v", vec![dec!(100), Decimal::ZERO, Decimal::ZERO]);
        let loan = Loan::vector("9", dec!(100), dec!(0.05), 3, "v").unwrap();
        let result = scheduled_cashflows(&loan, &vectors).unwrap();
        assert_eq!(result.result.periods.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_stop_with_sub_cent_residual_is_not_reported_as_paid() {
        let input = RunLoanInput {
            loan: Loan::fix_instalment("7", dec!(10_000), dec!(0.05), 360).unwrap(),
            vectors: AmortisationVectors::new(),
            scenario: Scenario::new(dec!(0.6), dec!(0.3), dec!(0.5), 0).unwrap(),
        };
        let result = run_loan(&input).unwrap();
        let last = result.result.periods.last().unwrap();

        assert!(result.result.periods.len() < 360);
        assert!(last.end_bal > Decimal::ZERO && last.end_bal <= dec!(0.005));
        assert!(result.warnings.iter().any(|w| w.contains("outstanding")));
        assert!(!result.warnings.iter().any(|w| w.contains("fully paid down")));
    }

    #[test]
    fn test_scheduled_cashflows_fix_instalment() {
        let loan = Loan::fix_instalment("1", dec!(500_000), dec!(0.08), 120).unwrap();
        let result = scheduled_cashflows(&loan, &AmortisationVectors::new()).unwrap();
        let first = &result.result.periods[0];
        assert_eq!(first.interest.round_dp(2), dec!(3333.33));
        // Level instalment every period.
        for row in &result.result.periods {
            assert!((row.payment - dec!(6066.38)).abs() < dec!(0.01));
        }
    }
}
