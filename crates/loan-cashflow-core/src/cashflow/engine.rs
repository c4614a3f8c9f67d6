//! Period-by-period default / prepayment / recovery waterfall.
//!
//! The engine advances one state (the running balance) through
//! [`step`]. [`AccrualSchedule`] folds that step over the loan's periods,
//! stopping at maturity or once the balance rounds to zero cents.
//! [`generate_cashflows`] then recognises liquidation, loss and recovery
//! `recovery_lag` periods after each default.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::amortisation::ScheduledProfile;
use crate::cashflow::table::{CashFlowPeriod, CashFlowTable, LaggedAmounts};
use crate::error::LoanCashflowError;
use crate::loan::Loan;
use crate::scenario::Scenario;
use crate::types::{Money, Rate};
use crate::LoanCashflowResult;

/// Negative ending balances smaller than this are floating drift and
/// clipped silently.
const CLIP_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Monthly rates for one (loan, scenario) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRates {
    pub smm_cpr: Rate,
    pub smm_cdr: Rate,
    pub coupon: Rate,
}

/// A period before default recognition: what the balance did this month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccrualRow {
    pub period: u32,
    pub beg_bal: Money,
    pub principal: Money,
    pub defaults: Money,
    pub prepayment: Money,
    pub end_bal: Money,
    pub interest: Money,
}

/// Finite, restartable sequence of [`AccrualRow`]s. Clone it to replay
/// from period 1.
#[derive(Debug, Clone)]
pub struct AccrualSchedule<'a> {
    profile: &'a ScheduledProfile,
    rates: MonthlyRates,
    balance: Money,
    period: u32,
}

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

impl MonthlyRates {
    pub fn new(loan: &Loan, scenario: &Scenario) -> Self {
        MonthlyRates {
            smm_cpr: scenario.smm_cpr(),
            smm_cdr: scenario.smm_cdr(),
            coupon: loan.monthly_rate(),
        }
    }
}

/// Advance one period from `beginning_balance`.
///
/// Defaults come off the opening balance first. The surviving balance then
/// amortises by the scheduled ratio for `period`, and prepays at SMM on what
/// the schedule leaves outstanding. Interest accrues on the full opening
/// balance. Returns the row and the new running balance (never negative).
pub fn step(
    beginning_balance: Money,
    period: u32,
    profile: &ScheduledProfile,
    rates: &MonthlyRates,
) -> (AccrualRow, Money) {
    let defaults = beginning_balance * rates.smm_cdr;
    let surviving = beginning_balance - defaults;
    let ratio = profile.ratio(period);

    let principal = surviving * (Decimal::ONE - ratio);
    let prepayment = surviving * rates.smm_cpr * ratio;

    let raw_end = beginning_balance - defaults - principal - prepayment;
    if raw_end < -CLIP_TOLERANCE {
        warn!(period, ending_balance = %raw_end, "ending balance clipped at zero");
    }
    let end_bal = raw_end.max(Decimal::ZERO);

    let row = AccrualRow {
        period,
        beg_bal: beginning_balance,
        principal,
        defaults,
        prepayment,
        end_bal,
        interest: beginning_balance * rates.coupon,
    };
    (row, end_bal)
}

// ---------------------------------------------------------------------------
// Fold over periods
// ---------------------------------------------------------------------------

impl<'a> AccrualSchedule<'a> {
    fn new(profile: &'a ScheduledProfile, rates: MonthlyRates) -> Self {
        AccrualSchedule {
            profile,
            rates,
            balance: profile.balance(0),
            period: 0,
        }
    }
}

impl Iterator for AccrualSchedule<'_> {
    type Item = AccrualRow;

    fn next(&mut self) -> Option<AccrualRow> {
        if self.period >= self.profile.term() || self.balance.round_dp(2) <= Decimal::ZERO {
            return None;
        }
        self.period += 1;
        let (row, end_bal) = step(self.balance, self.period, self.profile, &self.rates);
        self.balance = end_bal;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.profile.term() - self.period) as usize;
        (0, Some(remaining))
    }
}

/// Validate inputs and return the lazy row sequence for one loan.
pub fn accrual_rows<'a>(
    loan: &Loan,
    profile: &'a ScheduledProfile,
    scenario: &Scenario,
) -> LoanCashflowResult<AccrualSchedule<'a>> {
    loan.validate()?;
    scenario.validate()?;
    check_profile(loan, profile)?;
    Ok(AccrualSchedule::new(profile, MonthlyRates::new(loan, scenario)))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project a loan's cash flows under `scenario`.
///
/// The result has one row per period until the balance rounds to zero
/// cents or the term ends, whichever comes first.
pub fn generate_cashflows(
    loan: &Loan,
    profile: &ScheduledProfile,
    scenario: &Scenario,
) -> LoanCashflowResult<CashFlowTable> {
    let rows: Vec<AccrualRow> = accrual_rows(loan, profile, scenario)?.collect();
    let table = recognise_defaults(&rows, scenario);
    debug!(
        loan_id = %loan.loan_id,
        periods = table.len(),
        term = loan.term,
        "generated loan cash flows"
    );
    Ok(table)
}

/// Shift liquidation, loss and recovery forward by the recovery lag and
/// complete the total principal and payment columns.
fn recognise_defaults(rows: &[AccrualRow], scenario: &Scenario) -> CashFlowTable {
    let lag = scenario.recovery_lag as usize;

    let periods = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let lagged = idx
                .checked_sub(lag)
                .map(|src| lagged_amounts(rows[src].defaults, scenario))
                .unwrap_or_default();
            let total_princ = row.principal + lagged.recovery + row.prepayment;
            CashFlowPeriod {
                period: row.period,
                beg_bal: row.beg_bal,
                principal: row.principal,
                defaults: row.defaults,
                prepayment: row.prepayment,
                end_bal: row.end_bal,
                interest: row.interest,
                liquidation: lagged.liquidation,
                loss: lagged.loss,
                recovery: lagged.recovery,
                total_princ,
                payment: row.interest + total_princ,
            }
        })
        .collect();

    let mut beyond_horizon = LaggedAmounts::default();
    for row in &rows[rows.len().saturating_sub(lag)..] {
        beyond_horizon.accumulate(&lagged_amounts(row.defaults, scenario));
    }

    CashFlowTable {
        periods,
        beyond_horizon,
    }
}

fn lagged_amounts(defaults: Money, scenario: &Scenario) -> LaggedAmounts {
    LaggedAmounts {
        liquidation: defaults,
        loss: defaults * scenario.severity(),
        recovery: defaults * scenario.recovery,
    }
}

fn check_profile(loan: &Loan, profile: &ScheduledProfile) -> LoanCashflowResult<()> {
    if profile.term() != loan.term {
        return Err(LoanCashflowError::DegenerateSchedule {
            loan_id: loan.loan_id.clone(),
            period: profile.term(),
            reason: format!(
                "profile covers {} periods but the loan term is {}",
                profile.term(),
                loan.term
            ),
        });
    }
    if profile.balance(0) != loan.orig_balance {
        return Err(LoanCashflowError::DegenerateSchedule {
            loan_id: loan.loan_id.clone(),
            period: 0,
            reason: format!(
                "profile opens at {} but the original balance is {}",
                profile.balance(0),
                loan.orig_balance
            ),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortisation::scheduled_profile;
    use crate::loan::AmortisationVectors;

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    fn profile_for(loan: &Loan) -> ScheduledProfile {
        scheduled_profile(loan, &AmortisationVectors::new()).unwrap()
    }

    fn stressed() -> Scenario {
        Scenario::new(dec!(0.10), dec!(0.05), dec!(0.60), 3).unwrap()
    }

    #[test]
    fn test_step_splits_balance() {
        let loan = Loan::fix_instalment("1", dec!(100_000), dec!(0.06), 360).unwrap();
        let profile = profile_for(&loan);
        let rates = MonthlyRates::new(&loan, &stressed());

        let (row, end) = step(dec!(100_000), 1, &profile, &rates);

        assert_close(row.defaults, dec!(100_000) * rates.smm_cdr, dec!(0.0000001), "default");
        assert_eq!(row.interest, dec!(500));
        assert_eq!(row.end_bal, end);
        assert_close(
            row.beg_bal - row.defaults - row.principal - row.prepayment,
            end,
            dec!(0.0000001),
            "balance identity",
        );
    }

    #[test]
    fn test_step_past_schedule_end_does_not_divide_by_zero() {
        let profile = ScheduledProfile::new(
            "1",
            vec![dec!(100), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO],
        )
        .unwrap();
        let rates = MonthlyRates {
            smm_cpr: dec!(0.01),
            smm_cdr: dec!(0.01),
            coupon: dec!(0.005),
        };
        let (row, end) = step(dec!(10), 3, &profile, &rates);
        assert_eq!(row.principal, Decimal::ZERO);
        assert_eq!(row.defaults, dec!(0.1));
        assert_close(end, dec!(9.9) * dec!(0.99), dec!(0.0000001), "end balance");
    }

    #[test]
    fn test_zero_scenario_tracks_schedule() {
        let loan = Loan::fix_instalment("1", dec!(250_000), dec!(0.05), 240).unwrap();
        let profile = profile_for(&loan);
        let table = generate_cashflows(&loan, &profile, &Scenario::zero()).unwrap();

        assert_eq!(table.len(), 240);
        for row in &table {
            let scheduled = profile.balance(row.period);
            assert_close(row.end_bal, scheduled, dec!(0.000001), "end balance vs schedule");
        }
    }

    #[test]
    fn test_iterator_is_restartable() {
        let loan = Loan::fix_instalment("1", dec!(50_000), dec!(0.07), 60).unwrap();
        let profile = profile_for(&loan);
        let rows = accrual_rows(&loan, &profile, &stressed()).unwrap();

        let first: Vec<AccrualRow> = rows.clone().collect();
        let second: Vec<AccrualRow> = rows.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rows_chain_balances() {
        let loan = Loan::fix_instalment("1", dec!(50_000), dec!(0.07), 60).unwrap();
        let profile = profile_for(&loan);
        let table = generate_cashflows(&loan, &profile, &stressed()).unwrap();
        for pair in table.periods.windows(2) {
            assert_eq!(pair[1].beg_bal, pair[0].end_bal);
        }
        assert!(table.periods.iter().all(|p| p.end_bal >= Decimal::ZERO));
    }

    #[test]
    fn test_recovery_lag_shift() {
        let loan = Loan::bullet("1", dec!(1_000_000), dec!(0.05), 24).unwrap();
        let profile = profile_for(&loan);
        let scenario = stressed();
        let table = generate_cashflows(&loan, &profile, &scenario).unwrap();

        for p in 1..=3 {
            let row = table.period(p).unwrap();
            assert_eq!(row.liquidation, Decimal::ZERO);
            assert_eq!(row.loss, Decimal::ZERO);
            assert_eq!(row.recovery, Decimal::ZERO);
        }
        for p in 1..=21 {
            let source = table.period(p).unwrap();
            let target = table.period(p + 3).unwrap();
            assert_eq!(target.liquidation, source.defaults);
            assert_eq!(target.loss, source.defaults * dec!(0.40));
            assert_eq!(target.recovery, source.defaults * dec!(0.60));
        }
    }

    #[test]
    fn test_defaults_beyond_horizon_are_reported() {
        let loan = Loan::bullet("1", dec!(1_000_000), dec!(0.05), 24).unwrap();
        let profile = profile_for(&loan);
        let scenario = stressed();
        let table = generate_cashflows(&loan, &profile, &scenario).unwrap();

        let late_defaults: Decimal = table.periods[21..].iter().map(|p| p.defaults).sum();
        assert_eq!(table.beyond_horizon.liquidation, late_defaults);
        assert_close(
            table.beyond_horizon.recovery,
            late_defaults * dec!(0.60),
            dec!(0.0000001),
            "recovery beyond horizon",
        );
    }

    #[test]
    fn test_zero_lag_recognises_immediately() {
        let loan = Loan::bullet("1", dec!(1000), dec!(0.05), 12).unwrap();
        let profile = profile_for(&loan);
        let scenario = Scenario::new(Decimal::ZERO, dec!(0.2), dec!(0.5), 0).unwrap();
        let table = generate_cashflows(&loan, &profile, &scenario).unwrap();
        let first = table.period(1).unwrap();
        assert!(first.defaults > Decimal::ZERO);
        assert_eq!(first.liquidation, first.defaults);
        assert_eq!(first.total_princ, first.principal + first.recovery + first.prepayment);
        assert_eq!(first.payment, first.interest + first.total_princ);
        assert_eq!(table.beyond_horizon, LaggedAmounts::default());
    }

    #[test]
    fn test_profile_term_mismatch_is_degenerate() {
        let loan = Loan::bullet("1", dec!(100), dec!(0.05), 12).unwrap();
        let other = Loan::bullet("1", dec!(100), dec!(0.05), 6).unwrap();
        let profile = profile_for(&other);
        assert!(matches!(
            generate_cashflows(&loan, &profile, &Scenario::zero()).unwrap_err(),
            LoanCashflowError::DegenerateSchedule { .. }
        ));
    }

    #[test]
    fn test_invalid_scenario_rejected_before_computation() {
        let loan = Loan::bullet("1", dec!(100), dec!(0.05), 12).unwrap();
        let profile = profile_for(&loan);
        let scenario = Scenario {
            cpr: dec!(1.5),
            ..Scenario::zero()
        };
        assert!(matches!(
            generate_cashflows(&loan, &profile, &scenario).unwrap_err(),
            LoanCashflowError::InvalidLoanParameter { .. }
        ));
    }

    #[test]
    fn test_vector_paid_early_stops_emitting() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 4, "v").unwrap();
        let mut vectors = AmortisationVectors::new();
        vectors.insert("v", vec![dec!(50), dec!(50), Decimal::ZERO, Decimal::ZERO]);
        let profile = scheduled_profile(&loan, &vectors).unwrap();
        let table = generate_cashflows(&loan, &profile, &stressed()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.final_balance(), Decimal::ZERO);
    }

    #[test]
    fn test_small_balances_run_to_maturity() {
        let loan = Loan::fix_instalment("1", dec!(50), dec!(0.05), 360).unwrap();
        let profile = profile_for(&loan);
        let table = generate_cashflows(&loan, &profile, &Scenario::zero()).unwrap();
        assert_eq!(table.len(), 360);
        assert_eq!(table.final_balance(), Decimal::ZERO);
        let collected: Decimal = table.iter().map(|r| r.total_princ).sum();
        assert!((collected - dec!(50)).abs() < dec!(0.0001));

        let loan = Loan::bullet("2", dec!(0.4), dec!(0.05), 12).unwrap();
        let profile = profile_for(&loan);
        let table = generate_cashflows(&loan, &profile, &Scenario::zero()).unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table.period(12).unwrap().principal, dec!(0.4));
    }
}
