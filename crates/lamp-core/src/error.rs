//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used across the pipeline. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - `SchemaError` is fatal: no batch can run without a schema.
//! - `ParseError` and `MapError` are line-scoped and recoverable. The driver
//!   records them in the skip report and moves on to the next line.
//! - `ColumnMappingError` is raised while building a mapper, before any line
//!   is read.

use thiserror::Error;

use crate::value::FieldType;

/// Failure to load a schema document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is not valid JSON, or does not have the expected shape.
    #[error("malformed schema document at '{pointer}': {reason}")]
    Malformed {
        /// JSON Pointer to the offending location (empty for the root).
        pointer: String,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Two field definitions share a name.
    #[error("duplicate field '{name}' in schema document")]
    DuplicateField {
        /// The repeated field name.
        name: String,
    },

    /// A field declares a `type` outside the recognized set.
    #[error("field '{field}' declares unknown type '{type_name}'")]
    UnknownType {
        /// Name of the field carrying the bad type.
        field: String,
        /// The unrecognized type string as written.
        type_name: String,
    },
}

impl SchemaError {
    /// Shorthand for [`SchemaError::Malformed`].
    pub fn malformed(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to split one input line into tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A quoted field was opened but never closed before the end of the line.
    #[error("line {line}: unterminated quote opened at column {column}")]
    UnterminatedQuote {
        /// 1-based physical line number.
        line: usize,
        /// 1-based character column of the opening quote.
        column: usize,
    },

    /// The line's bytes are not valid UTF-8.
    #[error("line {line}: invalid UTF-8 at byte {byte}")]
    InvalidUtf8 {
        /// 1-based physical line number.
        line: usize,
        /// 1-based byte offset of the first invalid byte within the line.
        byte: usize,
    },
}

impl ParseError {
    /// The input line the error is attributed to.
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedQuote { line, .. } | Self::InvalidUtf8 { line, .. } => *line,
        }
    }
}

/// Failure to coerce a raw record into a typed record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The record has a different number of tokens than the column mapping.
    #[error("expected {expected} columns, found {found}")]
    ColumnCountMismatch {
        /// Number of columns in the mapping.
        expected: usize,
        /// Number of tokens on the line.
        found: usize,
    },

    /// A token could not be coerced to the field's declared type.
    #[error("field '{field}': cannot read {token:?} as {expected}: {reason}")]
    TypeMismatch {
        /// Name of the target field.
        field: String,
        /// Declared type of the target field.
        expected: FieldType,
        /// The raw token as it appeared in the input.
        token: String,
        /// Why the coercion failed.
        reason: String,
    },
}

/// A column order that cannot be applied to a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColumnMappingError {
    /// No columns were given.
    #[error("column mapping is empty")]
    Empty,

    /// A column names a field the schema does not define.
    #[error("column {position} names unknown field '{name}'")]
    UnknownField {
        /// 1-based column position.
        position: usize,
        /// The unknown field name.
        name: String,
    },

    /// A field is mapped to more than one column. Only a GEOGRAPHY field
    /// may span two adjacent columns.
    #[error("field '{name}' is mapped to more than one column")]
    DuplicateColumn {
        /// The repeated field name.
        name: String,
    },
}

/// Top-level error type for callers that want a single error.
#[derive(Error, Debug)]
pub enum LampError {
    /// Schema could not be loaded.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Input line could not be tokenized.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Raw record could not be typed.
    #[error("map error: {0}")]
    Map(#[from] MapError),

    /// Column mapping does not fit the schema.
    #[error("column mapping error: {0}")]
    ColumnMapping(#[from] ColumnMappingError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
