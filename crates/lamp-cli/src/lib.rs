//! # lamp-cli — CLI Tool for fuzzy-lamp
//!
//! Provides the `lamp` command-line interface over the transform pipeline.
//!
//! ## Subcommands
//!
//! - `lamp transform` — Run one CSV-to-JSON batch and write NDJSON records
//!   plus a skip report.
//! - `lamp schema` — Load a field-list schema and print a summary or its
//!   canonical form.
//!
//! ```bash
//! lamp transform --schema files/jsonSchema.json --input files/inputFile.txt \
//!     --config files/pipeline.yaml --output out.ndjson --skip-report skipped.ndjson
//! lamp schema files/jsonSchema.json --normalize
//! ```
//!
//! Handlers return the process exit code: `0` on success, `2` when
//! `--strict` is set and lines were skipped. Errors map to `1` in `main`.

pub mod schema;
pub mod transform;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Read a UTF-8 input file, naming its role in the error.
pub fn read_text(path: &Path, role: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {role} file '{}'", path.display()))
}

/// Read a file as raw bytes. Encoding is left to the consumer, so one bad
/// line cannot fail the whole read.
pub fn read_bytes(path: &Path, role: &str) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("cannot read {role} file '{}'", path.display()))
}

/// Open `path` for writing, or fall back to a standard stream.
pub fn open_sink(
    path: Option<&Path>,
    fallback: impl FnOnce() -> Box<dyn Write>,
) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("cannot create output file '{}'", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(fallback()),
    }
}
