use serde_json::Value;
use std::io;

use super::{effect_rows, format_value, report, EFFECT_COLUMNS};

/// Write every effect table as CSV to stdout, keyed by a leading `period`
/// column; linked summary rows carry `summary`.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    for record in csv_records(value) {
        let _ = wtr.write_record(&record);
    }
    let _ = wtr.flush();
}

fn csv_records(value: &Value) -> Vec<Vec<String>> {
    let report = report(value);
    let mut records = Vec::new();

    let mut header = vec!["period".to_string()];
    header.extend(EFFECT_COLUMNS.iter().map(|c| c.to_string()));
    records.push(header);

    if let Some(Value::Array(periods)) = report.get("periods") {
        for period in periods {
            let label = period.get("period").map(format_value).unwrap_or_default();
            for row in effect_rows(&period["effects"]) {
                let mut record = vec![label.clone()];
                record.extend(row);
                records.push(record);
            }
        }
    }

    if let Some(summary) = report.get("summary") {
        for row in effect_rows(summary) {
            let mut record = vec!["summary".to_string()];
            record.extend(row);
            records.push(record);
        }
    }

    records
}
