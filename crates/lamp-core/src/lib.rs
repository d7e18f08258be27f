//! # lamp-core — Foundational Types for the Transform Pipeline
//!
//! Defines the value model shared by every stage of the CSV-to-JSON
//! pipeline: the six warehouse column types, the typed values a raw token
//! is coerced into, the record shapes that flow between stages, and the
//! error hierarchy.
//!
//! ## Key Design Principles
//!
//! 1. **One `FieldType` enum.** The six recognized column types are a closed
//!    set. Every `match` on `FieldType` is exhaustive, so adding a type forces
//!    the mapper and the emitter to handle it.
//!
//! 2. **No binary floating point for measurements.** `NUMERIC` values are
//!    held as a [`Decimal`] (scaled integer), never as `f64`.
//!
//! 3. **Line-scoped errors carry their line.** Parse errors know the physical
//!    input line they came from; the driver attaches line numbers to map
//!    errors and violations when it records a skip.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lamp-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod record;
pub mod value;

pub use error::{ColumnMappingError, LampError, MapError, ParseError, SchemaError};
pub use record::{RawRecord, TypedRecord};
pub use value::{Decimal, DecimalParseError, FieldType, GeoParseError, GeoPoint, TypedValue, UnknownFieldType};
