use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use loan_cashflow_core::cashflow::{self, CashFlowTable, RunLoanInput};
use loan_cashflow_core::portfolio::{self, PortfolioInput, SweepInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Single loan
// ---------------------------------------------------------------------------

#[napi]
pub fn run_loan(input_json: String) -> NapiResult<String> {
    let input: RunLoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = cashflow::run_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Same input shape as `run_loan`; any scenario supplied is ignored.
#[napi]
pub fn scheduled_cashflows(input_json: String) -> NapiResult<String> {
    let input: RunLoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        cashflow::scheduled_cashflows(&input.loan, &input.vectors).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

#[napi]
pub fn run_portfolio(input_json: String) -> NapiResult<String> {
    let input: PortfolioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = portfolio::run_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sweep_scenarios(input_json: String) -> NapiResult<String> {
    let input: SweepInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = portfolio::sweep_scenarios(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Weighted average life
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WalInput {
    table: CashFlowTable,
    original_balance: Decimal,
}

#[napi]
pub fn calculate_wal(input_json: String) -> NapiResult<String> {
    let input: WalInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let wal = loan_cashflow_core::wal::weighted_average_life(&input.table, input.original_balance)
        .map_err(to_napi_error)?;
    serde_json::to_string(&wal).map_err(to_napi_error)
}
