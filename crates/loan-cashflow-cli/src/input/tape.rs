use loan_cashflow_core::{AmortisationVectors, Loan, LoanRecord};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::input::file;

type TapeResult<T> = Result<T, Box<dyn std::error::Error>>;

/// One row of a long-format amortisation vector file.
#[derive(Debug, Deserialize)]
struct VectorRow {
    vector_id: String,
    period: u32,
    amount: Decimal,
}

/// Read a loan tape CSV with header
/// `loan_id,orig_balance,coupon,term,amortisation_type,vector_id`.
pub fn read_loan_tape(path: &str) -> TapeResult<Vec<Loan>> {
    let canonical = file::resolve_path(path)?;
    let reader = csv::Reader::from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_loan_tape(reader, &canonical.display().to_string())
}

/// Read amortisation vectors from JSON (`{"id": [..]}`) or from a CSV of
/// `vector_id,period,amount` rows.
pub fn read_vectors(path: &str) -> TapeResult<AmortisationVectors> {
    let is_json = Path::new(path)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        return file::read_json(path);
    }

    let canonical = file::resolve_path(path)?;
    let reader = csv::Reader::from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_vectors(reader, &canonical.display().to_string())
}

/// Loans from an open tape; `source` prefixes line-numbered errors.
fn parse_loan_tape<R: io::Read>(mut reader: csv::Reader<R>, source: &str) -> TapeResult<Vec<Loan>> {
    let mut loans = Vec::new();
    for (idx, row) in reader.deserialize::<LoanRecord>().enumerate() {
        let line = idx + 2;
        let record = row.map_err(|e| format!("{} line {}: {}", source, line, e))?;
        let loan = Loan::try_from(record).map_err(|e| format!("{} line {}: {}", source, line, e))?;
        loans.push(loan);
    }
    Ok(loans)
}

/// Group long-format rows by vector id. Every vector must list periods
/// 1..n exactly once.
fn parse_vectors<R: io::Read>(
    mut reader: csv::Reader<R>,
    source: &str,
) -> TapeResult<AmortisationVectors> {
    let mut grouped: BTreeMap<String, BTreeMap<u32, Decimal>> = BTreeMap::new();
    for (idx, row) in reader.deserialize::<VectorRow>().enumerate() {
        let line = idx + 2;
        let row = row.map_err(|e| format!("{} line {}: {}", source, line, e))?;
        let periods = grouped.entry(row.vector_id.clone()).or_default();
        if periods.insert(row.period, row.amount).is_some() {
            return Err(format!(
                "{} line {}: vector '{}' lists period {} more than once",
                source, line, row.vector_id, row.period
            )
            .into());
        }
    }

    let mut vectors = AmortisationVectors::new();
    for (vector_id, periods) in grouped {
        let expected: Vec<u32> = (1..=periods.len() as u32).collect();
        if !periods.keys().copied().eq(expected) {
            return Err(format!(
                "{}: vector '{}' must list periods 1..{} without gaps",
                source,
                vector_id,
                periods.len()
            )
            .into());
        }
        vectors.insert(vector_id, periods.into_values().collect());
    }
    Ok(vectors)
}
