//! # Transform Driver
//!
//! Runs one batch: parse, then per record map, validate, and emit or skip.
//!
//! ## State Machine
//!
//! ```text
//! Idle ──run──▶ Parsing ──(per record: Mapping → Validating → Emitting | Skipping)──▶ Done
//!   └── schema load fails ──▶ Aborted
//! ```
//!
//! Every per-line failure is recoverable: the line goes to the skip report
//! with the stage it failed in, and the batch carries on. The only fatal
//! condition is a schema that does not load, which [`run_batch`] reports as
//! [`DriverError::Aborted`] with no partial output;
//! [`DriverError::final_state`] is then [`DriverState::Aborted`].
//!
//! ## Ordering
//!
//! With `parallelism == 1` each line is parsed, mapped, and validated before
//! the next line is read. With more workers the input is parsed first, split
//! into contiguous line ranges, mapped and validated on scoped threads, and
//! merged by a single reducer in range order. Both modes emit records and
//! skips in input line order. With more than one worker, a line's parse no
//! longer finishes before the next line's mapping starts; parallelism buys
//! throughput at the cost of that strict line-by-line ordering.
//!
//! ## Cancellation
//!
//! A [`CancellationToken`] is checked between records. A cancelled batch
//! returns the in-order prefix it finished, flagged `cancelled`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use lamp_core::{ColumnMappingError, MapError, ParseError, RawRecord, SchemaError, TypedRecord};
use lamp_schema::{Rule, SchemaDocument, SchemaValidator, ValidationResult, Violation};

use crate::config::{ConfigError, PipelineConfig};
use crate::mapper::{ColumnMapping, FieldMapper};
use crate::parser::RecordParser;

/// Batch-level driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Built, no batch run yet.
    Idle,
    /// Reading input.
    Parsing,
    /// Last batch finished (possibly cancelled).
    Done,
    /// Schema failed to load; nothing ran.
    Aborted,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Parsing => "parsing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        })
    }
}

/// Stage at which a line was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parsing,
    Mapping,
    Validating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parsing => "parsing",
            Self::Mapping => "mapping",
            Self::Validating => "validating",
        })
    }
}

/// Why a line did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Parse(ParseError),
    Map(MapError),
    Invalid(Vec<Violation>),
}

impl SkipReason {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Parse(_) => Stage::Parsing,
            Self::Map(_) => Stage::Mapping,
            Self::Invalid(_) => Stage::Validating,
        }
    }

    /// Violations for a validation skip; empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Invalid(v) => v,
            _ => &[],
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Map(e) => write!(f, "{e}"),
            Self::Invalid(violations) => {
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
        }
    }
}

/// One entry of the skip report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based input line number.
    pub line: usize,
    pub reason: SkipReason,
}

impl Serialize for SkippedLine {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("stage", &self.reason.stage())?;
        map.serialize_entry("reason", &self.reason.to_string())?;
        map.serialize_entry("violations", self.reason.violations())?;
        map.end()
    }
}

/// Result of one completed batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Valid records in input line order.
    pub emitted: Vec<TypedRecord>,
    /// Lines that produced no record, in input line order.
    pub skipped: Vec<SkippedLine>,
    /// The batch stopped early on a cancellation request.
    pub cancelled: bool,
}

impl BatchReport {
    /// True when every non-blank line was emitted.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    fn absorb(&mut self, outcome: LineOutcome) {
        match outcome {
            LineOutcome::Emit(record) => self.emitted.push(record),
            LineOutcome::Skip(skip) => self.skipped.push(skip),
        }
    }
}

/// Cooperative stop flag shared between a driver and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the batch to stop before its next record.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Failure before any line is processed.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The schema did not load. This is the only fatal batch condition.
    #[error("batch aborted: {0}")]
    Aborted(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ColumnMapping(#[from] ColumnMappingError),
}

impl DriverError {
    /// State the batch ended in: `Aborted` for a schema that did not load,
    /// `Idle` for setup errors raised before any batch started.
    pub fn final_state(&self) -> DriverState {
        match self {
            Self::Aborted(_) => DriverState::Aborted,
            Self::Config(_) | Self::ColumnMapping(_) => DriverState::Idle,
        }
    }
}

enum LineOutcome {
    Emit(TypedRecord),
    Skip(SkippedLine),
}

fn skip(line: usize, reason: SkipReason) -> LineOutcome {
    LineOutcome::Skip(SkippedLine { line, reason })
}

/// Map, validate, and decide one parsed line.
fn process_record(mapper: &FieldMapper, validator: &SchemaValidator, raw: &RawRecord) -> LineOutcome {
    let line = raw.line();
    tracing::trace!(line, "mapping");
    let typed = match mapper.map(raw) {
        Ok(typed) => typed,
        Err(e) => {
            tracing::warn!(line, error = %e, "skipping line: mapping failed");
            return skip(line, SkipReason::Map(e));
        }
    };

    tracing::trace!(line, "validating");
    match validator.validate(typed) {
        ValidationResult::Valid(record) => {
            tracing::trace!(line, "emitting");
            LineOutcome::Emit(record)
        }
        ValidationResult::Invalid(_, violations) => {
            tracing::warn!(
                line,
                violations = violations.len(),
                "skipping line: validation failed"
            );
            skip(line, SkipReason::Invalid(violations))
        }
    }
}

fn parse_failure(e: ParseError) -> LineOutcome {
    let line = e.line();
    tracing::warn!(line, error = %e, "skipping line: parse failed");
    skip(line, SkipReason::Parse(e))
}

/// Batch runner bound to one schema and column mapping.
#[derive(Debug)]
pub struct TransformDriver {
    parser: RecordParser,
    mapper: FieldMapper,
    validator: SchemaValidator,
    parallelism: usize,
    cancel: CancellationToken,
    state: DriverState,
}

impl TransformDriver {
    /// Build a driver for `schema` under `config`.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Config` for unusable settings and
    /// `DriverError::ColumnMapping` if `config.columns` does not fit the schema.
    pub fn new(schema: Arc<SchemaDocument>, config: &PipelineConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let mapping = match &config.columns {
            Some(columns) => ColumnMapping::new(columns.as_slice(), &schema)?,
            None => ColumnMapping::from_schema(&schema),
        };
        Ok(Self {
            parser: RecordParser::new(config.delimiter).with_skip_header(config.skip_header),
            mapper: FieldMapper::new(mapping),
            validator: SchemaValidator::new(schema),
            parallelism: config.parallelism,
            cancel: CancellationToken::new(),
            state: DriverState::Idle,
        })
    }

    /// Add a business rule, applied after the required-field check.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.validator = self.validator.with_rule(rule);
        self
    }

    /// Use a caller-held cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that can cancel this driver's batches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn mapping(&self) -> &ColumnMapping {
        self.mapper.mapping()
    }

    /// Run one batch over `input`.
    ///
    /// Never fails: per-line problems land in [`BatchReport::skipped`].
    pub fn run(&mut self, input: impl AsRef<[u8]>) -> BatchReport {
        let input = input.as_ref();
        let span = tracing::info_span!("batch", run_id = %Uuid::new_v4(), workers = self.parallelism);
        let _enter = span.enter();

        self.state = DriverState::Parsing;
        let report = if self.parallelism > 1 {
            self.run_partitioned(input)
        } else {
            self.run_sequential(input)
        };
        self.state = DriverState::Done;

        tracing::info!(
            emitted = report.emitted.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            "batch complete"
        );
        report
    }

    fn run_sequential(&self, input: &[u8]) -> BatchReport {
        let mut report = BatchReport::default();
        for item in self.parser.parse(input) {
            if self.cancel.is_cancelled() {
                tracing::info!("batch cancelled");
                report.cancelled = true;
                break;
            }
            let outcome = match item {
                Ok(raw) => process_record(&self.mapper, &self.validator, &raw),
                Err(e) => parse_failure(e),
            };
            report.absorb(outcome);
        }
        report
    }

    fn run_partitioned(&self, input: &[u8]) -> BatchReport {
        let mut report = BatchReport::default();

        let mut parsed: Vec<Result<RawRecord, ParseError>> = Vec::new();
        for item in self.parser.parse(input) {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            parsed.push(item);
        }
        if parsed.is_empty() {
            return report;
        }

        let chunk_size = parsed.len().div_ceil(self.parallelism);
        tracing::debug!(lines = parsed.len(), chunk_size, "partitioned input");

        let mapper = &self.mapper;
        let validator = &self.validator;
        let cancel = &self.cancel;
        let partitions: Vec<(Vec<LineOutcome>, bool)> = std::thread::scope(|scope| {
            let handles: Vec<_> = parsed
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        let mut outcomes = Vec::with_capacity(chunk.len());
                        for item in chunk {
                            if cancel.is_cancelled() {
                                return (outcomes, false);
                            }
                            outcomes.push(match item {
                                Ok(raw) => process_record(mapper, validator, raw),
                                Err(e) => parse_failure(e.clone()),
                            });
                        }
                        (outcomes, true)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        // Single reducer: ranges are contiguous and in order, so appending
        // them restores input order. Stop at the first range cut short.
        for (outcomes, completed) in partitions {
            for outcome in outcomes {
                report.absorb(outcome);
            }
            if !completed {
                tracing::info!("batch cancelled");
                report.cancelled = true;
                break;
            }
        }
        report
    }
}

/// Load `schema_text` and run one batch over `input`.
///
/// # Errors
///
/// `DriverError::Aborted` if the schema does not load; no records are
/// produced. Config and column-mapping errors are reported before any line
/// is read.
pub fn run_batch(
    schema_text: &str,
    input: impl AsRef<[u8]>,
    config: &PipelineConfig,
) -> Result<BatchReport, DriverError> {
    let schema = SchemaDocument::load(schema_text).map_err(|e| {
        let err = DriverError::Aborted(e);
        tracing::error!(error = %err, state = %err.final_state(), "schema failed to load");
        err
    })?;
    let mut driver = TransformDriver::new(Arc::new(schema), config)?;
    Ok(driver.run(input))
}
