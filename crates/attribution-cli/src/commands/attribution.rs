use clap::{Args, ValueEnum};
use serde_json::Value;
use tracing::debug;

use attribution_core::{
    build_input, run_attribution, AttributionConfig, AttributionInput, AttributionRecord,
    CategoryReconciliation, MissingValuePolicy,
};

use crate::input;
use crate::input::stdin::Piped;

/// Arguments for multi-period attribution
#[derive(Args)]
pub struct AttributeArgs {
    /// Path to input file: CSV records, a JSON array of records, or a JSON
    /// single_period / multi_period object
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON or YAML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Handling of missing weights and returns
    #[arg(long, value_enum)]
    pub missing_values: Option<MissingValuesArg>,

    /// Handling of category sets that differ between periods
    #[arg(long, value_enum)]
    pub categories: Option<CategoriesArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MissingValuesArg {
    Error,
    TreatAsZero,
}

impl From<MissingValuesArg> for MissingValuePolicy {
    fn from(arg: MissingValuesArg) -> Self {
        match arg {
            MissingValuesArg::Error => MissingValuePolicy::Error,
            MissingValuesArg::TreatAsZero => MissingValuePolicy::TreatAsZero,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoriesArg {
    Strict,
    ZeroPad,
}

impl From<CategoriesArg> for CategoryReconciliation {
    fn from(arg: CategoriesArg) -> Self {
        match arg {
            CategoriesArg::Strict => CategoryReconciliation::Strict,
            CategoriesArg::ZeroPad => CategoryReconciliation::ZeroPad,
        }
    }
}

fn load_config(args: &AttributeArgs) -> Result<AttributionConfig, Box<dyn std::error::Error>> {
    let mut config: AttributionConfig = match args.config {
        Some(ref path) => input::file::read_structured(path)?,
        None => AttributionConfig::default(),
    };
    if let Some(mv) = args.missing_values {
        config.missing_values = mv.into();
    }
    if let Some(c) = args.categories {
        config.categories = c.into();
    }
    Ok(config)
}

/// A JSON array is a list of records; an object is a tagged attribution input.
fn input_from_value(
    value: Value,
    policy: MissingValuePolicy,
) -> Result<AttributionInput, Box<dyn std::error::Error>> {
    if value.is_array() {
        let records: Vec<AttributionRecord> = serde_json::from_value(value)?;
        Ok(build_input(&records, policy)?)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

pub fn run_attribute(args: AttributeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    let attribution_input = if let Some(ref path) = args.input {
        if path.to_ascii_lowercase().ends_with(".csv") {
            let records: Vec<AttributionRecord> = input::file::read_csv(path)?;
            build_input(&records, config.missing_values)?
        } else {
            input_from_value(input::file::read_json_value(path)?, config.missing_values)?
        }
    } else if let Some(piped) = input::stdin::read_stdin()? {
        match piped {
            Piped::Json(data) => input_from_value(data, config.missing_values)?,
            Piped::Csv(text) => {
                let records: Vec<AttributionRecord> = input::file::parse_csv(text.as_bytes())?;
                build_input(&records, config.missing_values)?
            }
        }
    } else {
        return Err("--input <file.json|file.csv> or stdin required for attribution".into());
    };

    debug!(
        missing_values = ?config.missing_values,
        categories = ?config.categories,
        "running attribution"
    );
    let result = run_attribution(&attribution_input, &config)?;
    Ok(serde_json::to_value(result)?)
}
