pub mod engine;
pub mod run;
pub mod table;

pub use engine::{accrual_rows, generate_cashflows, step, AccrualRow, AccrualSchedule, MonthlyRates};
pub use run::{run_loan, scheduled_cashflows, LoanCashflowOutput, RunLoanInput};
pub use table::{CashFlowPeriod, CashFlowSummary, CashFlowTable, LaggedAmounts};
