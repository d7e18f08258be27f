//! # lamp CLI entry point
//!
//! Parses command-line arguments, sets up logging on stderr, and dispatches
//! to subcommand handlers. Stdout carries only command output.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use lamp_cli::schema::{run_schema, SchemaArgs};
use lamp_cli::transform::{run_transform, TransformArgs};

/// fuzzy-lamp CSV-to-JSON transform tool
///
/// Turns delimited text into schema-checked NDJSON records, with a skip
/// report for every line that could not be emitted.
#[derive(Parser, Debug)]
#[command(name = "lamp", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one transform batch.
    Transform(TransformArgs),

    /// Load a schema and print its fields or canonical form.
    Schema(SchemaArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "lamp starting");

    let result = match cli.command {
        Commands::Transform(args) => run_transform(&args),
        Commands::Schema(args) => run_schema(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
