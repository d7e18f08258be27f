//! # Schema CLI — Inspect a field-list schema.
//!
//! ```bash
//! lamp schema files/jsonSchema.json              # field summary
//! lamp schema files/jsonSchema.json --normalize  # canonical JSON array
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use lamp_schema::SchemaDocument;

use crate::read_text;

/// Arguments for the `schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema document to load.
    pub path: PathBuf,

    /// Print the canonical re-serialization instead of a summary.
    #[arg(long)]
    pub normalize: bool,
}

/// Execute the schema subcommand.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    let text = read_text(&args.path, "schema")?;
    let doc = SchemaDocument::load(&text)
        .with_context(|| format!("loading schema '{}'", args.path.display()))?;

    if args.normalize {
        println!("{}", doc.to_json_string());
    } else {
        print!("{}", summary(&doc));
    }
    Ok(0)
}

fn summary(doc: &SchemaDocument) -> String {
    let mut out = String::new();
    for f in doc.fields() {
        let mode = if f.is_required() { "REQUIRED" } else { "NULLABLE" };
        // Writing to a String cannot fail.
        let _ = writeln!(out, "  {:<24} {:<10} {mode}", f.name(), f.field_type().as_str());
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {} fields ({} required)",
        doc.len(),
        doc.required_fields().count()
    );
    out
}
