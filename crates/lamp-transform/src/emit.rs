//! NDJSON output for emitted records and the skip report.
//!
//! One JSON object per line. Records keep the column mapping's field order;
//! values use their canonical text forms (WKT points, decimal strings with
//! the written scale, `YYYY-MM-DD` dates).

use std::io::Write;

use serde::Serialize;

use lamp_core::{LampError, TypedRecord};

use crate::driver::SkippedLine;

fn write_lines<T: Serialize, W: Write>(items: &[T], mut out: W) -> Result<(), LampError> {
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Write each record as one JSON object per line.
pub fn write_records<W: Write>(records: &[TypedRecord], out: W) -> Result<(), LampError> {
    write_lines(records, out)
}

/// Write each skipped line as `{"line","stage","reason","violations"}`.
pub fn write_skip_report<W: Write>(skipped: &[SkippedLine], out: W) -> Result<(), LampError> {
    write_lines(skipped, out)
}
