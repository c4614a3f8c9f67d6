//! Scheduled (zero-default, zero-prepayment) balance profiles.
//!
//! A profile holds `term + 1` balances: index 0 is the original balance and
//! index `term` is zero. The cash flow engine pro-rates actual balances
//! against the ratio of consecutive scheduled balances, so the same profile
//! serves every scenario.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanCashflowError;
use crate::loan::{Amortisation, AmortisationVectors, Loan};
use crate::rates::annuity_payment;
use crate::types::{Money, Rate};
use crate::LoanCashflowResult;

/// Residuals below this are treated as exactly zero (4 dp).
const SCHEDULE_EPSILON: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Serialises as the bare balance list; deserialising re-runs the checks
/// of [`ScheduledProfile::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Money>", into = "Vec<Money>")]
pub struct ScheduledProfile {
    balances: Vec<Money>,
}

impl TryFrom<Vec<Money>> for ScheduledProfile {
    type Error = LoanCashflowError;

    fn try_from(balances: Vec<Money>) -> LoanCashflowResult<Self> {
        ScheduledProfile::new("<deserialized>", balances)
    }
}

impl From<ScheduledProfile> for Vec<Money> {
    fn from(profile: ScheduledProfile) -> Self {
        profile.balances
    }
}

impl ScheduledProfile {
    /// Build a profile from explicit balances, rejecting anything that is
    /// not a valid amortisation: negative, increasing, or not reaching zero.
    pub fn new(loan_id: &str, balances: Vec<Money>) -> LoanCashflowResult<Self> {
        if balances.len() < 2 {
            return Err(degenerate(
                loan_id,
                0,
                "profile needs an opening balance and at least one period",
            ));
        }
        if balances[0] <= Decimal::ZERO {
            return Err(degenerate(loan_id, 0, "opening balance must be positive"));
        }

        // The opening balance is the loan's own and is never snapped.
        let balances: Vec<Money> = balances
            .into_iter()
            .enumerate()
            .map(|(idx, b)| if idx == 0 { b } else { snap_to_zero(b) })
            .collect();

        for (period, pair) in balances.windows(2).enumerate() {
            let period = period as u32 + 1;
            if pair[1] < Decimal::ZERO {
                return Err(degenerate(
                    loan_id,
                    period,
                    format!("scheduled balance is negative ({})", pair[1]),
                ));
            }
            if pair[1] > pair[0] {
                return Err(degenerate(
                    loan_id,
                    period,
                    format!("scheduled balance increases from {} to {}", pair[0], pair[1]),
                ));
            }
        }

        let last = balances.len() - 1;
        if !balances[last].is_zero() {
            return Err(degenerate(
                loan_id,
                last as u32,
                format!("schedule leaves {} outstanding at maturity", balances[last]),
            ));
        }

        Ok(ScheduledProfile { balances })
    }

    /// Number of scheduled periods.
    pub fn term(&self) -> u32 {
        (self.balances.len() - 1) as u32
    }

    pub fn balances(&self) -> &[Money] {
        &self.balances
    }

    /// Scheduled balance at the end of `period` (period 0 = origination).
    pub fn balance(&self, period: u32) -> Money {
        self.balances
            .get(period as usize)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Fraction of the period's opening balance that the schedule leaves
    /// outstanding after `period`. Once the schedule has fully amortised
    /// the ratio is 1: nothing further is due.
    pub fn ratio(&self, period: u32) -> Rate {
        if period == 0 {
            return Decimal::ONE;
        }
        let previous = self.balance(period - 1);
        if previous.is_zero() {
            return Decimal::ONE;
        }
        self.balance(period) / previous
    }

    /// Scheduled principal for periods 1..=term.
    pub fn principal(&self) -> Vec<Money> {
        self.balances.windows(2).map(|w| w[0] - w[1]).collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the scheduled balance profile for a loan.
///
/// Vector loans look up their principal vector in `vectors`; the other
/// variants ignore it.
pub fn scheduled_profile(
    loan: &Loan,
    vectors: &AmortisationVectors,
) -> LoanCashflowResult<ScheduledProfile> {
    loan.validate()?;

    let balances = match &loan.amortisation {
        Amortisation::FixInstalment => fix_instalment_balances(loan)?,
        Amortisation::Vector { vector_id } => vector_balances(loan, vector_id, vectors)?,
        Amortisation::Bullet => bullet_balances(loan),
    };

    ScheduledProfile::new(&loan.loan_id, balances)
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

fn fix_instalment_balances(loan: &Loan) -> LoanCashflowResult<Vec<Money>> {
    let monthly_rate = loan.monthly_rate();
    let instalment = annuity_payment(loan.orig_balance, monthly_rate, loan.term).ok_or_else(
        || {
            LoanCashflowError::invalid(
                "coupon",
                format!(
                    "Loan {}: no level instalment exists for monthly rate {}",
                    loan.loan_id, monthly_rate
                ),
            )
        },
    )?;

    let mut balances = Vec::with_capacity(loan.term as usize + 1);
    let mut balance = loan.orig_balance;
    balances.push(balance);

    for _ in 1..loan.term {
        // balance <= orig_balance, so this cannot overflow once the
        // instalment (which multiplies orig_balance by the rate) exists.
        let interest = balance * monthly_rate;
        let principal = (instalment - interest).max(Decimal::ZERO);
        balance = snap_to_zero(balance - principal).max(Decimal::ZERO);
        balances.push(balance);
    }
    // The final instalment settles whatever the level payments left over.
    balances.push(Decimal::ZERO);

    Ok(balances)
}

fn vector_balances(
    loan: &Loan,
    vector_id: &str,
    vectors: &AmortisationVectors,
) -> LoanCashflowResult<Vec<Money>> {
    let vector = vectors.get(vector_id).ok_or_else(|| {
        LoanCashflowError::MissingAmortizationVector {
            loan_id: loan.loan_id.clone(),
            vector_id: vector_id.to_string(),
            reason: "vector not found".into(),
        }
    })?;

    let term = loan.term as usize;
    if vector.len() < term {
        return Err(LoanCashflowError::MissingAmortizationVector {
            loan_id: loan.loan_id.clone(),
            vector_id: vector_id.to_string(),
            reason: format!("vector has {} entries, term needs {}", vector.len(), term),
        });
    }

    let mut balances = Vec::with_capacity(term + 1);
    let mut balance = loan.orig_balance;
    balances.push(balance);
    for principal in &vector[..term] {
        balance -= *principal;
        balances.push(balance);
    }

    Ok(balances)
}

fn bullet_balances(loan: &Loan) -> Vec<Money> {
    let mut balances = vec![loan.orig_balance; loan.term as usize];
    balances.push(Decimal::ZERO);
    balances
}

fn snap_to_zero(balance: Money) -> Money {
    if balance.abs() < SCHEDULE_EPSILON {
        Decimal::ZERO
    } else {
        balance
    }
}

fn degenerate(loan_id: &str, period: u32, reason: impl Into<String>) -> LoanCashflowError {
    LoanCashflowError::DegenerateSchedule {
        loan_id: loan_id.to_string(),
        period,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

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

    fn vectors_with(id: &str, principal: Vec<Money>) -> AmortisationVectors {
        let mut vectors = AmortisationVectors::new();
        vectors.insert(id, principal);
        vectors
    }

    #[test]
    fn test_fix_instalment_profile_shape() {
        let loan = Loan::fix_instalment("1", dec!(500_000), dec!(0.08), 120).unwrap();
        let profile = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap();

        assert_eq!(profile.balances().len(), 121);
        assert_eq!(profile.balance(0), dec!(500_000));
        assert_eq!(profile.balance(120), Decimal::ZERO);

        // First principal = 6066.38 - 3333.33
        assert_close(
            profile.balance(1),
            dec!(500_000) - (dec!(6066.38) - dec!(3333.33)),
            dec!(0.01),
            "balance after period 1",
        );
    }

    #[test]
    fn test_fix_instalment_principal_increases() {
        let loan = Loan::fix_instalment("1", dec!(100_000), dec!(0.06), 60).unwrap();
        let profile = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap();
        let principal = profile.principal();
        for w in principal.windows(2) {
            assert!(w[1] >= w[0], "annuity principal should be non-decreasing");
        }
        let total: Decimal = principal.iter().sum();
        assert_close(total, dec!(100_000), dec!(0.0001), "principal sums to balance");
    }

    #[test]
    fn test_zero_coupon_is_level_principal() {
        let loan = Loan::fix_instalment("1", dec!(1200), Decimal::ZERO, 12).unwrap();
        let profile = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap();
        assert_eq!(profile.balance(1), dec!(1100));
        assert_eq!(profile.balance(6), dec!(600));
        assert_eq!(profile.balance(12), Decimal::ZERO);
    }

    #[test]
    fn test_bullet_profile() {
        let loan = Loan::bullet("1", dec!(100), dec!(0.05), 12).unwrap();
        let profile = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap();
        for p in 0..12 {
            assert_eq!(profile.balance(p), dec!(100));
        }
        assert_eq!(profile.balance(12), Decimal::ZERO);
        assert_eq!(profile.ratio(12), Decimal::ZERO);
        assert_eq!(profile.ratio(5), Decimal::ONE);
    }

    #[test]
    fn test_vector_profile() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 4, "v").unwrap();
        let vectors = vectors_with("v", vec![dec!(10), dec!(20), dec!(30), dec!(40)]);
        let profile = scheduled_profile(&loan, &vectors).unwrap();
        assert_eq!(
            profile.balances(),
            &[dec!(100), dec!(90), dec!(70), dec!(40), Decimal::ZERO]
        );
    }

    #[test]
    fn test_vector_longer_than_term_uses_prefix() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 2, "v").unwrap();
        let vectors = vectors_with("v", vec![dec!(60), dec!(40), dec!(99)]);
        let profile = scheduled_profile(&loan, &vectors).unwrap();
        assert_eq!(profile.term(), 2);
    }

    #[test]
    fn test_missing_vector() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 4, "absent").unwrap();
        let err = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap_err();
        assert!(matches!(
            err,
            LoanCashflowError::MissingAmortizationVector { .. }
        ));
    }

    #[test]
    fn test_short_vector() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 4, "v").unwrap();
        let vectors = vectors_with("v", vec![dec!(50), dec!(50)]);
        let err = scheduled_profile(&loan, &vectors).unwrap_err();
        assert!(matches!(
            err,
            LoanCashflowError::MissingAmortizationVector { .. }
        ));
    }

    #[test]
    fn test_vector_not_reaching_zero_is_degenerate() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 3, "v").unwrap();
        let vectors = vectors_with("v", vec![dec!(10), dec!(10), dec!(10)]);
        let err = scheduled_profile(&loan, &vectors).unwrap_err();
        match err {
            LoanCashflowError::DegenerateSchedule { period, .. } => assert_eq!(period, 3),
            other => panic!("Expected DegenerateSchedule, got {other:?}"),
        }
    }

    #[test]
    fn test_vector_overpaying_is_degenerate() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 2, "v").unwrap();
        let vectors = vectors_with("v", vec![dec!(80), dec!(80)]);
        assert!(matches!(
            scheduled_profile(&loan, &vectors).unwrap_err(),
            LoanCashflowError::DegenerateSchedule { period: 2, .. }
        ));
    }

    #[test]
    fn test_negative_vector_entry_is_non_monotonic() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 3, "v").unwrap();
        let vectors = vectors_with("v", vec![dec!(50), dec!(-10), dec!(60)]);
        assert!(matches!(
            scheduled_profile(&loan, &vectors).unwrap_err(),
            LoanCashflowError::DegenerateSchedule { period: 2, .. }
        ));
    }

    #[test]
    fn test_ratio_guard_after_full_amortisation() {
        let profile = ScheduledProfile::new(
            "1",
            vec![dec!(100), dec!(50), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO],
        )
        .unwrap();
        assert_eq!(profile.ratio(2), Decimal::ZERO);
        assert_eq!(profile.ratio(3), Decimal::ONE);
        assert_eq!(profile.ratio(4), Decimal::ONE);
    }

    #[test]
    fn test_tiny_residual_is_snapped() {
        let profile =
            ScheduledProfile::new("1", vec![dec!(100), dec!(50), dec!(0.00000001)]).unwrap();
        assert_eq!(profile.balance(2), Decimal::ZERO);
    }

    #[test]
    fn test_long_term_high_coupon_builds_without_overflow() {
        for (coupon, term) in [(dec!(0.08), 12_000), (dec!(2.5), 360)] {
            let loan = Loan::fix_instalment("1", dec!(100_000), coupon, term).unwrap();
            let profile = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap();

            assert_eq!(profile.term(), term);
            assert_eq!(profile.balance(term), Decimal::ZERO);
            assert!(profile.balances().windows(2).all(|w| w[1] <= w[0]));
        }
    }

    #[test]
    fn test_sub_epsilon_opening_balance_is_kept() {
        let loan = Loan::bullet("1", dec!(0.00005), dec!(0.05), 3).unwrap();
        let profile = scheduled_profile(&loan, &AmortisationVectors::new()).unwrap();
        assert_eq!(profile.balance(0), dec!(0.00005));
        assert_eq!(profile.balance(3), Decimal::ZERO);
    }

    #[test]
    fn test_deserialising_runs_validation() {
        let profile: ScheduledProfile = serde_json::from_str(r#"["100", "40", "0"]"#).unwrap();
        assert_eq!(profile.term(), 2);
        assert_eq!(serde_json::to_string(&profile).unwrap(), r#"["100","40","0"]"#);

        assert!(serde_json::from_str::<ScheduledProfile>("[]").is_err());
        assert!(serde_json::from_str::<ScheduledProfile>(r#"["100", "120", "0"]"#).is_err());
    }
}
