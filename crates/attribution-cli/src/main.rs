mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::attribution::AttributeArgs;

/// Multi-period portfolio performance attribution
#[derive(Parser)]
#[command(
    name = "pattr",
    version,
    about = "Multi-period portfolio performance attribution",
    long_about = "Decomposes a portfolio's excess return over its benchmark into allocation, \
                  selection+interaction and total effects per category (Brinson-Fachler, \
                  top-down) and links them across periods (Modified Frongello)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run single- or multi-period attribution
    Attribute(AttributeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// The parsed `RUST_LOG` filter, or `warn` when it is unset or malformed.
fn filter_or_default<E>(parsed: Result<EnvFilter, E>) -> EnvFilter {
    parsed.unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn init_logging() {
    let filter = filter_or_default(EnvFilter::try_from_default_env());

    // Logs go to stderr; stdout carries the report.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Attribute(args) => commands::attribution::run_attribute(args),
        Commands::Version => {
            println!("pattr {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
