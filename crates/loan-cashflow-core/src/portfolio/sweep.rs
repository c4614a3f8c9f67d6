//! One-dimensional scenario sensitivity for a pool.
//!
//! Scheduled profiles are scenario independent, so they are built once in a
//! [`ProfileCache`] and reused for every grid point.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortisation::ProfileCache;
use crate::error::LoanCashflowError;
use crate::loan::{AmortisationVectors, Loan};
use crate::portfolio::aggregate::aggregate;
use crate::portfolio::run::{generate_pool, total_balance, validate_pool};
use crate::scenario::Scenario;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::wal::weighted_average_life;
use crate::LoanCashflowResult;

/// Upper bound on grid points in one sweep.
pub const MAX_SWEEP_POINTS: usize = 1_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Scenario field varied across the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    Cpr,
    Cdr,
    Recovery,
    RecoveryLag,
}

/// Grid of values: an explicit list or an inclusive `min..=max` range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepValues {
    List(Vec<Decimal>),
    Range {
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub vectors: AmortisationVectors,
    /// Values for the parameters that are not swept.
    #[serde(default)]
    pub base_scenario: Scenario,
    pub parameter: SweepParameter,
    pub values: SweepValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: Decimal,
    pub scenario: Scenario,
    pub wal_years: Years,
    pub num_periods: u32,
    pub total_principal_collected: Money,
    pub total_interest: Money,
    pub total_losses: Money,
    pub total_recoveries: Money,
    pub cumulative_loss_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutput {
    pub parameter: SweepParameter,
    pub total_original_balance: Money,
    pub points: Vec<SweepPoint>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the pool once per grid value and report pool WAL and loss figures.
pub fn sweep_scenarios(input: &SweepInput) -> LoanCashflowResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();

    validate_pool(&input.loans)?;
    input.base_scenario.validate()?;
    let values = input.values.expand()?;
    let scenarios = values
        .iter()
        .map(|v| input.parameter.apply(&input.base_scenario, *v))
        .collect::<LoanCashflowResult<Vec<_>>>()?;

    let mut cache = ProfileCache::new();
    cache.warm(&input.loans, &input.vectors)?;
    let total_original_balance = total_balance(&input.loans);

    let mut points = Vec::with_capacity(values.len());
    for (value, scenario) in values.iter().zip(scenarios) {
        let tables = generate_pool(&input.loans, &cache, &scenario)?;
        let pool = aggregate(&tables);
        let summary = pool.summary(total_original_balance);
        points.push(SweepPoint {
            value: *value,
            scenario,
            wal_years: weighted_average_life(&pool, total_original_balance)?,
            num_periods: summary.num_periods,
            total_principal_collected: summary.total_principal_collected,
            total_interest: summary.total_interest,
            total_losses: summary.total_losses,
            total_recoveries: summary.total_recoveries,
            cumulative_loss_rate: summary.cumulative_loss_rate,
        });
    }

    debug!(
        parameter = ?input.parameter,
        points = points.len(),
        profiles = cache.len(),
        "scenario sweep complete"
    );

    let output = SweepOutput {
        parameter: input.parameter,
        total_original_balance,
        points,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Scenario sensitivity sweep — pool WAL and losses across one scenario parameter",
        &serde_json::json!({
            "parameter": input.parameter,
            "base_scenario": input.base_scenario,
            "values": input.values,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Grid helpers
// ---------------------------------------------------------------------------

impl SweepParameter {
    /// Copy of `base` with this parameter set to `value`, validated.
    pub fn apply(&self, base: &Scenario, value: Decimal) -> LoanCashflowResult<Scenario> {
        let mut scenario = *base;
        match self {
            SweepParameter::Cpr => scenario.cpr = value,
            SweepParameter::Cdr => scenario.cdr = value,
            SweepParameter::Recovery => scenario.recovery = value,
            SweepParameter::RecoveryLag => {
                scenario.recovery_lag = value
                    .fract()
                    .is_zero()
                    .then(|| value.to_u32())
                    .flatten()
                    .ok_or_else(|| {
                        LoanCashflowError::invalid(
                            "recovery_lag",
                            format!("Recovery lag must be a non-negative whole number of periods, got {value}"),
                        )
                    })?;
            }
        }
        scenario.validate()?;
        Ok(scenario)
    }
}

impl SweepValues {
    /// Materialise the grid. A range always includes `max`.
    pub fn expand(&self) -> LoanCashflowResult<Vec<Decimal>> {
        let values = match self {
            SweepValues::List(values) => values.clone(),
            SweepValues::Range { min, max, step } => {
                if *step <= Decimal::ZERO {
                    return Err(LoanCashflowError::invalid("values.step", "Step must be positive"));
                }
                if min > max {
                    return Err(LoanCashflowError::invalid("values.min", "Min must be <= max"));
                }
                let steps = max
                    .checked_sub(*min)
                    .and_then(|span| span.checked_div(*step))
                    .and_then(|n| n.floor().to_usize());
                match steps {
                    Some(n) if n < MAX_SWEEP_POINTS => {}
                    _ => {
                        return Err(LoanCashflowError::invalid(
                            "values",
                            format!("Range {min}:{max}:{step} exceeds {MAX_SWEEP_POINTS} points"),
                        ))
                    }
                }
                let mut values = Vec::new();
                let mut current = *min;
                while current <= *max {
                    values.push(current);
                    current += *step;
                }
                if let Some(&last) = values.last() {
                    if last < *max {
                        values.push(*max);
                    }
                }
                values
            }
        };

        if values.is_empty() {
            return Err(LoanCashflowError::InsufficientData(
                "Sweep needs at least one value".into(),
            ));
        }
        if values.len() > MAX_SWEEP_POINTS {
            return Err(LoanCashflowError::invalid(
                "values",
                format!("Sweep is limited to {MAX_SWEEP_POINTS} points, got {}", values.len()),
            ));
        }
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
