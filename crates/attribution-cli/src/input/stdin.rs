use serde_json::Value;
use std::io::{self, Read};

/// Input piped on stdin.
pub enum Piped {
    Json(Value),
    Csv(String),
}

/// Read piped input, if any. Text starting with `{` or `[` is parsed as
/// JSON, anything else is kept as CSV.
/// Returns None if stdin is a TTY (interactive).
pub fn read_stdin() -> Result<Option<Piped>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    classify(&buffer)
}

fn classify(buffer: &str) -> Result<Option<Piped>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Ok(Some(Piped::Json(serde_json::from_str(trimmed)?)))
    } else {
        Ok(Some(Piped::Csv(trimmed.to_string())))
    }
}
