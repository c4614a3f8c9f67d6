//! Prepayment, default and recovery assumptions for a single run.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanCashflowError;
use crate::rates::annual_to_smm;
use crate::types::Rate;
use crate::LoanCashflowResult;

/// Scenario assumptions applied uniformly to every loan in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    /// Annual conditional prepayment rate, in [0, 1).
    #[serde(default)]
    pub cpr: Rate,
    /// Annual constant default rate, in [0, 1).
    #[serde(default)]
    pub cdr: Rate,
    /// Fraction of defaulted principal recovered, in [0, 1].
    #[serde(default)]
    pub recovery: Rate,
    /// Periods between a default and recognition of its loss and recovery.
    #[serde(default)]
    pub recovery_lag: u32,
}

impl Scenario {
    pub fn new(cpr: Rate, cdr: Rate, recovery: Rate, recovery_lag: u32) -> LoanCashflowResult<Self> {
        let scenario = Scenario {
            cpr,
            cdr,
            recovery,
            recovery_lag,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// No prepayment, no default: the scheduled amortisation.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> LoanCashflowResult<()> {
        if self.cpr < Decimal::ZERO || self.cpr >= Decimal::ONE {
            return Err(LoanCashflowError::invalid(
                "cpr",
                "CPR must be in [0, 1)",
            ));
        }
        if self.cdr < Decimal::ZERO || self.cdr >= Decimal::ONE {
            return Err(LoanCashflowError::invalid(
                "cdr",
                "CDR must be in [0, 1)",
            ));
        }
        if self.recovery < Decimal::ZERO || self.recovery > Decimal::ONE {
            return Err(LoanCashflowError::invalid(
                "recovery",
                "Recovery rate must be between 0 and 1",
            ));
        }
        Ok(())
    }

    pub fn smm_cpr(&self) -> Rate {
        annual_to_smm(self.cpr)
    }

    pub fn smm_cdr(&self) -> Rate {
        annual_to_smm(self.cdr)
    }

    /// Loss severity implied by the recovery rate.
    pub fn severity(&self) -> Rate {
        Decimal::ONE - self.recovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_scenario_is_valid() {
        let s = Scenario::zero();
        assert!(s.validate().is_ok());
        assert_eq!(s.smm_cpr(), Decimal::ZERO);
        assert_eq!(s.smm_cdr(), Decimal::ZERO);
        assert_eq!(s.severity(), Decimal::ONE);
    }

    #[test]
    fn test_rates_outside_range_rejected() {
        assert!(Scenario::new(Decimal::ONE, Decimal::ZERO, Decimal::ZERO, 0).is_err());
        assert!(Scenario::new(Decimal::ZERO, dec!(-0.01), Decimal::ZERO, 0).is_err());
        assert!(Scenario::new(Decimal::ZERO, dec!(1.0), Decimal::ZERO, 0).is_err());
        assert!(Scenario::new(Decimal::ZERO, Decimal::ZERO, dec!(1.01), 0).is_err());
    }

    #[test]
    fn test_full_recovery_is_valid() {
        let s = Scenario::new(dec!(0.1), dec!(0.05), Decimal::ONE, 6).unwrap();
        assert_eq!(s.severity(), Decimal::ZERO);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let s: Scenario = serde_json::from_str(r#"{"cdr": "0.02"}"#).unwrap();
        assert_eq!(s.cdr, dec!(0.02));
        assert_eq!(s.cpr, Decimal::ZERO);
        assert_eq!(s.recovery_lag, 0);
    }

    #[test]
    fn test_negative_lag_does_not_deserialise() {
        assert!(serde_json::from_str::<Scenario>(r#"{"recovery_lag": -1}"#).is_err());
    }
}
