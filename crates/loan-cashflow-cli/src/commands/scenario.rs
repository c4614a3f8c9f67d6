use clap::Args;
use rust_decimal::Decimal;

use loan_cashflow_core::Scenario;

use crate::input;

/// Scenario assumptions; flags override values read from `--scenario`.
#[derive(Args, Debug, Clone, Default)]
pub struct ScenarioArgs {
    /// Path to JSON scenario file ({"cpr", "cdr", "recovery", "recovery_lag"})
    #[arg(long)]
    pub scenario: Option<String>,

    /// Annual conditional prepayment rate (e.g. 0.06 for 6% CPR)
    #[arg(long)]
    pub cpr: Option<Decimal>,

    /// Annual constant default rate (e.g. 0.02 for 2% CDR)
    #[arg(long)]
    pub cdr: Option<Decimal>,

    /// Recovery rate on defaulted principal (0 to 1)
    #[arg(long)]
    pub recovery: Option<Decimal>,

    /// Months between default and recognition of loss and recovery
    #[arg(long)]
    pub recovery_lag: Option<u32>,
}

impl ScenarioArgs {
    /// Resolve against `base`: scenario file first, then individual flags.
    pub fn resolve(&self, base: Scenario) -> Result<Scenario, Box<dyn std::error::Error>> {
        let mut scenario = match &self.scenario {
            Some(path) => input::file::read_json(path)?,
            None => base,
        };
        if let Some(cpr) = self.cpr {
            scenario.cpr = cpr;
        }
        if let Some(cdr) = self.cdr {
            scenario.cdr = cdr;
        }
        if let Some(recovery) = self.recovery {
            scenario.recovery = recovery;
        }
        if let Some(lag) = self.recovery_lag {
            scenario.recovery_lag = lag;
        }
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_base() {
        let args = ScenarioArgs {
            cdr: Some(dec!(0.03)),
            recovery_lag: Some(4),
            ..ScenarioArgs::default()
        };
        let base = Scenario::new(dec!(0.1), dec!(0.01), dec!(0.5), 0).unwrap();
        let s = args.resolve(base).unwrap();
        assert_eq!(s.cpr, dec!(0.1));
        assert_eq!(s.cdr, dec!(0.03));
        assert_eq!(s.recovery_lag, 4);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = ScenarioArgs {
            recovery: Some(dec!(1.2)),
            ..ScenarioArgs::default()
        };
        assert!(args.resolve(Scenario::zero()).is_err());
    }
}
