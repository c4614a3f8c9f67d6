//! Weighted average life.

use rust_decimal::Decimal;

use crate::cashflow::CashFlowTable;
use crate::error::LoanCashflowError;
use crate::rates::MONTHS_PER_YEAR;
use crate::types::{Money, Years};
use crate::LoanCashflowResult;

/// WAL in years: `Σ total_princ[p] * p / 12 / original_balance`.
///
/// The denominator is supplied by the caller so a sub-selection of a pool
/// can be measured against its own exposure. Principal that never returns
/// (losses, balances still outstanding) lowers the figure.
pub fn weighted_average_life(
    table: &CashFlowTable,
    original_balance: Money,
) -> LoanCashflowResult<Years> {
    if original_balance <= Decimal::ZERO {
        return Err(LoanCashflowError::invalid(
            "original_balance",
            "WAL denominator must be positive",
        ));
    }

    let weighted: Decimal = table
        .iter()
        .map(|row| row.total_princ * Decimal::from(row.period) / MONTHS_PER_YEAR)
        .sum();

    Ok(weighted / original_balance)
}
