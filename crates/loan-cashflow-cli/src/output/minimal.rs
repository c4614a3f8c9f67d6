use serde_json::Value;

use super::{format_cell, result_of};

/// Print just the headline figure: WAL for loan and portfolio runs, one
/// `value wal` line per grid point for sweeps.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Some(Value::Array(points)) = result.get("points") {
        for point in points {
            let grid = point.get("value").map(format_cell).unwrap_or_default();
            let wal = point.get("wal_years").map(format_cell).unwrap_or_default();
            println!("{} {}", grid, wal);
        }
        return;
    }

    match result.get("wal_years") {
        Some(wal) if !wal.is_null() => println!("{}", format_cell(wal)),
        _ => println!("{}", format_cell(result)),
    }
}
