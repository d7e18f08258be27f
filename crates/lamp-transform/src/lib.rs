//! # lamp-transform — CSV-to-JSON Transform Pipeline
//!
//! Turns delimited text into schema-checked typed records:
//!
//! ```text
//! input ──parse──▶ RawRecord ──map──▶ TypedRecord ──validate──▶ emit | skip
//! ```
//!
//! - [`parser`] splits lines into tokens (minimal double-quote escaping).
//! - [`mapper`] coerces tokens to the schema's declared types.
//! - [`driver`] runs a batch: every per-line failure becomes a skip-report
//!   entry and the batch continues. Only a schema that fails to load
//!   aborts.
//! - [`emit`] writes emitted records and the skip report as NDJSON.
//! - [`config`] holds the YAML-loadable pipeline settings.

pub mod config;
pub mod driver;
pub mod emit;
pub mod mapper;
pub mod parser;

pub use config::{ConfigError, PipelineConfig};
pub use driver::{
    run_batch, BatchReport, CancellationToken, DriverError, DriverState, SkipReason, SkippedLine,
    Stage, TransformDriver,
};
pub use emit::{write_records, write_skip_report};
pub use mapper::{ColumnMapping, FieldMapper};
pub use parser::{RecordParser, Records, DEFAULT_DELIMITER};
