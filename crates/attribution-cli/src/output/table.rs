use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{effect_rows, format_value, report, EFFECT_COLUMNS};

const RETURN_FIELDS: [&str; 4] = [
    "portfolio_return",
    "benchmark_return",
    "excess_return",
    "residual",
];

fn effect_table(rows: Vec<Vec<String>>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(EFFECT_COLUMNS);
    for row in rows {
        builder.push_record(row);
    }
    builder.build()
}

/// Format the attribution report as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let report = report(value);

    if let Some(Value::Array(periods)) = report.get("periods") {
        for period in periods {
            let label = period.get("period").map(format_value).unwrap_or_default();
            println!("Period {}", label);
            println!("{}\n", effect_table(effect_rows(&period["effects"])));
        }
    }

    match report.get("summary") {
        Some(summary) => {
            println!("Summary");
            println!("{}", effect_table(effect_rows(summary)));
        }
        None => println!("{}", value),
    }

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for field in RETURN_FIELDS {
        if let Some(v) = report.get(field) {
            builder.push_record([field.to_string(), format_value(v)]);
        }
    }
    println!("\n{}", builder.build());

    // Print warnings if any
    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
