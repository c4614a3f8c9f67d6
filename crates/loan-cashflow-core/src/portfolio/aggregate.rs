//! Period-aligned summation of loan cash flow tables.

use crate::cashflow::{CashFlowPeriod, CashFlowTable, LaggedAmounts};

/// Sum tables field by field, aligned on period index. A table shorter than
/// the longest contributes zero to the periods it does not have.
pub fn aggregate<'a, I>(tables: I) -> CashFlowTable
where
    I: IntoIterator<Item = &'a CashFlowTable>,
{
    let mut periods: Vec<CashFlowPeriod> = Vec::new();
    let mut beyond_horizon = LaggedAmounts::default();

    for table in tables {
        if table.len() > periods.len() {
            let start = periods.len() as u32 + 1;
            let end = table.len() as u32;
            periods.extend((start..=end).map(CashFlowPeriod::zero));
        }
        for (pool_row, row) in periods.iter_mut().zip(table.iter()) {
            pool_row.accumulate(row);
        }
        beyond_horizon.accumulate(&table.beyond_horizon);
    }

    CashFlowTable {
        periods,
        beyond_horizon,
    }
}
