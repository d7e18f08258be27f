//! # lamp-schema — Schema Registry & Record Validation
//!
//! ## Registry (`registry`)
//!
//! [`SchemaDocument::load`] parses a warehouse field-list schema: a JSON
//! array of `{name, type, mode?}` objects, optionally wrapped as
//! `{"BigQuery Schema": [...]}`. The structural shape is checked against an
//! embedded JSON Schema before any field is interpreted, so malformed input
//! is reported with a JSON Pointer to the offending element.
//!
//! ## Validation (`validate`)
//!
//! [`SchemaValidator`] checks a typed record for required-field presence,
//! then applies any registered [`Rule`]s in declaration order. Type
//! conformity is not rechecked here: the mapper refuses tokens that do not
//! coerce.
//!
//! ## Crate Policy
//!
//! - Depends only on `lamp-core` internally.
//! - A loaded `SchemaDocument` is immutable and shared read-only.

pub mod registry;
pub mod validate;

pub use registry::{FieldDefinition, SchemaDocument, WRAPPED_SCHEMA_KEY};
pub use validate::{validate, Rule, SchemaValidator, ValidationResult, Violation};
