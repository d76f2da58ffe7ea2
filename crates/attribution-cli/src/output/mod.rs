pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Column order of every effect table.
pub const EFFECT_COLUMNS: [&str; 4] = ["category", "allocation", "selection_interaction", "total"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The report inside the `result` envelope, or the value itself.
pub(crate) fn report(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Effect rows of a serialized table, cells in [`EFFECT_COLUMNS`] order.
pub(crate) fn effect_rows(table: &Value) -> Vec<Vec<String>> {
    table
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    EFFECT_COLUMNS
                        .iter()
                        .map(|c| row.get(*c).map(format_value).unwrap_or_default())
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
