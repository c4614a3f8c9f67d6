use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use loan_cashflow_core::portfolio::{
    self, PortfolioInput, SweepInput, SweepParameter, SweepValues,
};
use loan_cashflow_core::AmortisationVectors;

use crate::commands::scenario::ScenarioArgs;
use crate::input;

/// Where the pool's loans come from: a JSON input or a loan tape.
#[derive(Args)]
pub struct PoolArgs {
    /// Path to JSON input file (overrides --tape)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan tape CSV: loan_id,orig_balance,coupon,term,amortisation_type,vector_id
    #[arg(long)]
    pub tape: Option<String>,

    /// Amortisation vectors: JSON map or CSV of vector_id,period,amount
    #[arg(long)]
    pub vectors: Option<String>,
}

/// Arguments for a portfolio projection
#[derive(Args)]
pub struct PortfolioArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ParameterArg {
    Cpr,
    Cdr,
    Recovery,
    RecoveryLag,
}

/// Arguments for a one-parameter scenario sweep
#[derive(Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Scenario parameter to sweep
    #[arg(long, value_enum)]
    pub parameter: Option<ParameterArg>,

    /// Comma-separated values (e.g. "0,0.02,0.05")
    #[arg(long, value_delimiter = ',')]
    pub values: Option<Vec<Decimal>>,

    /// Range in format min:max:step (e.g. "0:0.1:0.02")
    #[arg(long)]
    pub range: Option<String>,
}

impl From<ParameterArg> for SweepParameter {
    fn from(arg: ParameterArg) -> Self {
        match arg {
            ParameterArg::Cpr => SweepParameter::Cpr,
            ParameterArg::Cdr => SweepParameter::Cdr,
            ParameterArg::Recovery => SweepParameter::Recovery,
            ParameterArg::RecoveryLag => SweepParameter::RecoveryLag,
        }
    }
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut pf_input: PortfolioInput = match args.pool.input.as_deref() {
        Some(path) => input::file::read_json(path)?,
        None => match &args.pool.tape {
            Some(tape) => PortfolioInput {
                loans: input::tape::read_loan_tape(tape)?,
                vectors: read_vectors(args.pool.vectors.as_deref())?,
                scenario: Default::default(),
            },
            None => input::file::read_json_or_stdin(None, "portfolio")?
                .ok_or("--input <file.json>, --tape <loans.csv> or stdin required for portfolio projection")?,
        },
    };
    pf_input.scenario = args.scenario.resolve(pf_input.scenario)?;
    info!(loans = pf_input.loans.len(), "running portfolio projection");

    let result = portfolio::run_portfolio(&pf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sweep_input: SweepInput = match args.pool.input.as_deref() {
        Some(path) => input::file::read_json(path)?,
        None => {
            let tape = args
                .pool
                .tape
                .as_deref()
                .ok_or("--input <file.json> or --tape <loans.csv> required for sweep")?;
            let parameter = args
                .parameter
                .ok_or("--parameter is required when sweeping a loan tape")?;
            SweepInput {
                loans: input::tape::read_loan_tape(tape)?,
                vectors: read_vectors(args.pool.vectors.as_deref())?,
                base_scenario: Default::default(),
                parameter: parameter.into(),
                values: SweepValues::List(Vec::new()),
            }
        }
    };

    sweep_input.base_scenario = args.scenario.resolve(sweep_input.base_scenario)?;
    if let Some(parameter) = args.parameter {
        sweep_input.parameter = parameter.into();
    }
    if let Some(values) = args.values {
        sweep_input.values = SweepValues::List(values);
    } else if let Some(range) = args.range.as_deref() {
        sweep_input.values = parse_range(range)?;
    }

    info!(
        loans = sweep_input.loans.len(),
        parameter = ?sweep_input.parameter,
        "running scenario sweep"
    );
    let result = portfolio::sweep_scenarios(&sweep_input)?;
    Ok(serde_json::to_value(result)?)
}

fn read_vectors(path: Option<&str>) -> Result<AmortisationVectors, Box<dyn std::error::Error>> {
    match path {
        Some(path) => input::tape::read_vectors(path),
        None => Ok(AmortisationVectors::new()),
    }
}

fn parse_range(spec: &str) -> Result<SweepValues, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("Range must be min:max:step, got '{}'", spec).into());
    }
    let parse = |s: &str| -> Result<Decimal, Box<dyn std::error::Error>> {
        s.trim()
            .parse::<Decimal>()
            .map_err(|e| format!("Invalid number '{}' in range: {}", s, e).into())
    };
    Ok(SweepValues::Range {
        min: parse(parts[0])?,
        max: parse(parts[1])?,
        step: parse(parts[2])?,
    })
}
