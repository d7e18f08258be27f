//! # Record Validation
//!
//! Checks a typed record against a [`SchemaDocument`].
//!
//! ## Checks, in Order
//!
//! 1. Every `REQUIRED` field is present and non-null. Each missing field
//!    yields one [`Violation`] with reason `"missing required field"`.
//! 2. Each registered [`Rule`], in registration order.
//!
//! A record is `Valid` only when both passes produce no violations. Type
//! conformity is already guaranteed by the mapper and is not rechecked.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use lamp_core::{FieldType, TypedRecord};

use crate::registry::{FieldDefinition, SchemaDocument};

/// Reason attached to required-field violations.
pub const MISSING_REQUIRED: &str = "missing required field";

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Field the finding is about.
    pub field_name: String,
    /// Declared type of that field, when the finding concerns a schema field.
    pub expected_type: Option<FieldType>,
    /// Human-readable description.
    pub reason: String,
}

impl Violation {
    pub fn new(
        field_name: impl Into<String>,
        expected_type: Option<FieldType>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            expected_type,
            reason: reason.into(),
        }
    }

    /// Violation for a required field that is absent or null.
    pub fn missing_required(field: &FieldDefinition) -> Self {
        Self::new(field.name(), Some(field.field_type()), MISSING_REQUIRED)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected_type {
            Some(t) => write!(f, "{} ({t}): {}", self.field_name, self.reason),
            None => write!(f, "{}: {}", self.field_name, self.reason),
        }
    }
}

/// Outcome of validating one record. The record travels with the result
/// either way so the caller can emit or audit it.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid(TypedRecord),
    Invalid(TypedRecord, Vec<Violation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Violations found; empty for `Valid`.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(_, v) => v,
        }
    }

    pub fn record(&self) -> &TypedRecord {
        match self {
            Self::Valid(r) | Self::Invalid(r, _) => r,
        }
    }

    pub fn into_record(self) -> TypedRecord {
        match self {
            Self::Valid(r) | Self::Invalid(r, _) => r,
        }
    }
}

/// A cross-field business rule.
///
/// Any `Fn(&TypedRecord) -> Option<Violation> + Send + Sync` closure is a
/// rule, so new rules plug in without touching the validator.
pub trait Rule: Send + Sync {
    /// Return a violation if the record breaks the rule.
    fn check(&self, record: &TypedRecord) -> Option<Violation>;
}

impl<F> Rule for F
where
    F: Fn(&TypedRecord) -> Option<Violation> + Send + Sync,
{
    fn check(&self, record: &TypedRecord) -> Option<Violation> {
        self(record)
    }
}

/// Required-field check alone, with no rules.
pub fn validate(record: TypedRecord, schema: &SchemaDocument) -> ValidationResult {
    let violations = required_field_violations(&record, schema);
    finish(record, violations)
}

fn required_field_violations(record: &TypedRecord, schema: &SchemaDocument) -> Vec<Violation> {
    schema
        .required_fields()
        .filter(|f| !record.has_value(f.name()))
        .map(Violation::missing_required)
        .collect()
}

fn finish(record: TypedRecord, violations: Vec<Violation>) -> ValidationResult {
    if violations.is_empty() {
        ValidationResult::Valid(record)
    } else {
        ValidationResult::Invalid(record, violations)
    }
}

/// Validator bound to one schema, with an ordered list of rules.
///
/// `Send + Sync`: one validator can be shared by every worker of a batch.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Arc<SchemaDocument>,
    rules: Vec<Arc<dyn Rule>>,
}

impl SchemaValidator {
    pub fn new(schema: Arc<SchemaDocument>) -> Self {
        Self {
            schema,
            rules: Vec::new(),
        }
    }

    /// Append a rule. Rules run in the order they are added.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run the required-field check, then every rule.
    pub fn validate(&self, record: TypedRecord) -> ValidationResult {
        let mut violations = required_field_violations(&record, &self.schema);
        violations.extend(self.rules.iter().filter_map(|r| r.check(&record)));
        finish(record, violations)
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("fields", &self.schema.len())
            .field("rules", &self.rules.len())
            .finish()
    }
}
