use serde_json::Value;

use super::{format_value, report};

/// Print just the key answer: the total effect of the summary `Total` row,
/// falling back to the excess return.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let report = report(value);

    let total = report
        .get("summary")
        .and_then(Value::as_array)
        .and_then(|rows| rows.last())
        .and_then(|row| row.get("total"))
        .filter(|v| !v.is_null());
    if let Some(v) = total {
        return format_value(v);
    }

    match report.get("excess_return") {
        Some(v) if !v.is_null() => format_value(v),
        _ => format_value(report),
    }
}
