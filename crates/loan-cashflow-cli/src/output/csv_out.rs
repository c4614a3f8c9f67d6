use serde_json::Value;
use std::io;

use super::{format_cell, result_of, ROW_SECTIONS};

/// Write output as CSV to stdout: the first row section present (periods,
/// sweep points, per-loan rows), else the result's scalar fields.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_of(value);

    let rows = ROW_SECTIONS
        .iter()
        .find_map(|section| result.get(*section).and_then(Value::as_array));

    match (rows, result) {
        (Some(rows), _) => write_rows(&mut wtr, rows),
        (None, Value::Object(map)) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in map {
                let _ = wtr.write_record([key.as_str(), &format_cell(val)]);
            }
        }
        (None, other) => {
            let _ = wtr.write_record([&format_cell(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };

    let headers: Vec<&str> = first
        .iter()
        .filter(|(_, v)| !v.is_object())
        .map(|(k, _)| k.as_str())
        .collect();
    let _ = wtr.write_record(&headers);

    for row in rows {
        if let Value::Object(map) = row {
            let record: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_period_rows_written_with_headers() {
        let rows = vec![
            json!({"period": 1, "beg_bal": "100", "end_bal": "90"}),
            json!({"period": 2, "beg_bal": "90", "end_bal": "0"}),
        ];
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, &rows);
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("beg_bal,end_bal,period"));
        assert_eq!(lines.next(), Some("100,90,1"));
        assert_eq!(lines.count(), 1);
    }
}
