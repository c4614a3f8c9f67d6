use clap::Args;
use serde_json::Value;

use loan_cashflow_core::cashflow::{self, RunLoanInput};

use crate::commands::scenario::ScenarioArgs;
use crate::input;

/// Arguments for a single-loan projection
#[derive(Args)]
pub struct LoanArgs {
    /// Path to JSON input file ({"loan", "vectors", "scenario"})
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

/// Arguments for the scheduled (no default, no prepayment) cash flows
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file ({"loan", "vectors"})
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut loan_input: RunLoanInput =
        input::file::read_json_or_stdin(args.input.as_deref(), "loan")?
            .ok_or("--input <file.json> or stdin required for loan projection")?;
    loan_input.scenario = args.scenario.resolve(loan_input.scenario)?;
    let result = cashflow::run_loan(&loan_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input: RunLoanInput =
        input::file::read_json_or_stdin(args.input.as_deref(), "schedule")?
            .ok_or("--input <file.json> or stdin required for scheduled cash flows")?;
    let result = cashflow::scheduled_cashflows(&loan_input.loan, &loan_input.vectors)?;
    Ok(serde_json::to_value(result)?)
}
