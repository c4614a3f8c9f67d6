use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_cell, result_of, ROW_SECTIONS};

/// Print a computation envelope as tables: headline fields, the summary
/// block, then every row section (periods, sweep points, per-loan rows).
pub fn print_table(value: &Value) {
    let result = result_of(value);
    let Value::Object(map) = result else {
        println!("{}", format_cell(result));
        return;
    };

    print_fields(map);

    if let Some(Value::Object(summary)) = map.get("summary") {
        println!("\nSummary:");
        print_fields(summary);
    }

    for section in ROW_SECTIONS {
        if let Some(Value::Array(rows)) = map.get(section) {
            println!("\n{}:", section);
            print_rows(rows);
        }
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Two-column table of the scalar fields of an object.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if !val.is_object() && !val.is_array() {
            builder.push_record([key.as_str(), &format_cell(val)]);
        }
    }
    println!("{}", Table::from(builder));
}

/// One row per array element, columns from the first element's keys.
fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first
        .iter()
        .filter(|(_, v)| !v.is_object())
        .map(|(k, _)| k.clone())
        .collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for row in rows {
        if let Value::Object(map) = row {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}
