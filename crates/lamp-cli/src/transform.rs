//! # Transform CLI — Run one CSV-to-JSON batch.
//!
//! Loads the schema, the input, and an optional YAML config; command-line
//! flags override config file values. Records go to `--output` (default
//! stdout) as NDJSON, skipped lines to `--skip-report` (default stderr).
//!
//! ```bash
//! lamp transform --schema files/jsonSchema.json --input files/inputFile.txt \
//!     --columns location,location,average_temperature,month,inches_of_rain,is_current,latest_measurement
//! lamp transform --schema s.json --input big.csv --jobs 8 --strict
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use lamp_transform::{run_batch, write_records, write_skip_report, PipelineConfig};

use crate::{open_sink, read_bytes, read_text};

/// Exit code for a completed batch that skipped lines under `--strict`.
pub const EXIT_SKIPPED: u8 = 2;

/// Arguments for the `transform` subcommand.
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Field-list schema document (bare array or wrapped form).
    #[arg(long)]
    pub schema: PathBuf,

    /// Delimited input file.
    #[arg(long)]
    pub input: PathBuf,

    /// YAML pipeline config.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// NDJSON output file. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// NDJSON skip report file. Defaults to stderr.
    #[arg(long)]
    pub skip_report: Option<PathBuf>,

    /// Column delimiter (overrides config).
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Comma-separated column order (overrides config).
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Drop the first non-blank input line.
    #[arg(long)]
    pub skip_header: bool,

    /// Number of mapping workers (overrides config).
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Exit with status 2 if any line was skipped.
    #[arg(long)]
    pub strict: bool,
}

/// Execute the transform subcommand.
pub fn run_transform(args: &TransformArgs) -> Result<u8> {
    let config = resolve_config(args)?;
    let schema_text = read_text(&args.schema, "schema")?;
    let input = read_bytes(&args.input, "input")?;

    let report = run_batch(&schema_text, &input, &config)
        .with_context(|| format!("cannot transform '{}'", args.input.display()))?;

    let out = open_sink(args.output.as_deref(), || Box::new(io::stdout().lock()))?;
    write_records(&report.emitted, out).context("writing records")?;

    let skips = open_sink(args.skip_report.as_deref(), || Box::new(io::stderr().lock()))?;
    write_skip_report(&report.skipped, skips).context("writing skip report")?;

    tracing::info!(
        emitted = report.emitted.len(),
        skipped = report.skipped.len(),
        "transform finished"
    );

    if args.strict && !report.is_clean() {
        tracing::warn!(skipped = report.skipped.len(), "strict mode: lines were skipped");
        return Ok(EXIT_SKIPPED);
    }
    Ok(0)
}

/// Config file values with command-line overrides applied.
fn resolve_config(args: &TransformArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config '{}'", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }
    if let Some(columns) = &args.columns {
        config.columns = Some(columns.clone());
    }
    if args.skip_header {
        config.skip_header = true;
    }
    if let Some(jobs) = args.jobs {
        config.parallelism = jobs;
    }
    config.validate()?;
    tracing::debug!(?config, "resolved pipeline config");
    Ok(config)
}
