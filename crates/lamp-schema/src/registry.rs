//! # Schema Registry
//!
//! Loads one field-list schema document and exposes it as an immutable
//! [`SchemaDocument`].
//!
//! ## Accepted Forms
//!
//! ```json
//! [{"name": "month", "type": "STRING", "mode": "REQUIRED"}, ...]
//! {"BigQuery Schema": [{"name": "month", "type": "STRING"}, ...]}
//! ```
//!
//! The second form is what the managed text-to-warehouse job reads from
//! `jsonSchema.json`. Both load to the same document.
//!
//! ## Load Order
//!
//! 1. Parse JSON. Failure is `SchemaError::Malformed` at the root.
//! 2. Check the list against the embedded field-list JSON Schema. Failure is
//!    `Malformed` with the pointer of the first offending location.
//! 3. Interpret each element in order: `type` (`UnknownType`), `mode`
//!    (`Malformed`), then name uniqueness (`DuplicateField`).

use std::collections::HashSet;

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::{json, Value};

use lamp_core::{FieldType, SchemaError};

/// Key under which the wrapped form nests the field list.
pub const WRAPPED_SCHEMA_KEY: &str = "BigQuery Schema";

const MODE_REQUIRED: &str = "REQUIRED";
const MODE_NULLABLE: &str = "NULLABLE";

/// Structural shape of a field list. Type names and modes are matched
/// case-insensitively in code, so they are only required to be strings here.
const FIELD_LIST_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "array",
  "minItems": 1,
  "items": {
    "type": "object",
    "required": ["name", "type"],
    "properties": {
      "name": { "type": "string", "minLength": 1 },
      "type": { "type": "string" },
      "mode": { "type": "string" },
      "description": { "type": "string" }
    }
  }
}"#;

/// One column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    name: String,
    field_type: FieldType,
    required: bool,
    description: Option<String>,
}

impl FieldDefinition {
    /// A nullable field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
        }
    }

    /// Mark the field `REQUIRED`.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn to_value(&self) -> Value {
        let mut obj = json!({
            "name": self.name,
            "type": self.field_type.as_str(),
        });
        if self.required {
            obj["mode"] = json!(MODE_REQUIRED);
        }
        if let Some(desc) = &self.description {
            obj["description"] = json!(desc);
        }
        obj
    }
}

/// Field definition as written, before interpretation.
#[derive(Deserialize)]
struct RawFieldDefinition {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// An ordered set of uniquely named field definitions.
///
/// Immutable once loaded. Share it behind an `Arc` when several stages or
/// threads need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDocument {
    fields: Vec<FieldDefinition>,
}

impl SchemaDocument {
    /// Load a schema document from JSON text.
    ///
    /// # Errors
    ///
    /// - `SchemaError::Malformed` if the text is not JSON or not a non-empty
    ///   list of `{name, type, mode?}` objects, or if a `mode` is neither
    ///   `NULLABLE` nor `REQUIRED`.
    /// - `SchemaError::UnknownType` if a `type` is outside the recognized set.
    /// - `SchemaError::DuplicateField` if two definitions share a name.
    pub fn load(schema_text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(schema_text)
            .map_err(|e| SchemaError::malformed("", format!("invalid JSON: {e}")))?;

        let (list, base) = match value {
            Value::Object(mut map) => match map.remove(WRAPPED_SCHEMA_KEY) {
                Some(inner) => (inner, format!("/{WRAPPED_SCHEMA_KEY}")),
                None => (Value::Object(map), String::new()),
            },
            other => (other, String::new()),
        };

        check_structure(&list, &base)?;

        let raw: Vec<RawFieldDefinition> = serde_json::from_value(list)
            .map_err(|e| SchemaError::malformed(base.as_str(), e.to_string()))?;

        let mut fields = Vec::with_capacity(raw.len());
        for (i, def) in raw.into_iter().enumerate() {
            let field_type: FieldType =
                def.type_name
                    .parse()
                    .map_err(|_| SchemaError::UnknownType {
                        field: def.name.clone(),
                        type_name: def.type_name.clone(),
                    })?;

            let required = match def.mode.as_deref() {
                None => false,
                Some(m) if m.eq_ignore_ascii_case(MODE_NULLABLE) => false,
                Some(m) if m.eq_ignore_ascii_case(MODE_REQUIRED) => true,
                Some(other) => {
                    return Err(SchemaError::malformed(
                        format!("{base}/{i}/mode"),
                        format!("unsupported mode {other:?}; expected NULLABLE or REQUIRED"),
                    ))
                }
            };

            fields.push(FieldDefinition {
                name: def.name,
                field_type,
                required,
                description: def.description,
            });
        }

        let doc = Self::from_fields(fields)?;
        tracing::debug!(
            fields = doc.len(),
            required = doc.required_fields().count(),
            "schema document loaded"
        );
        Ok(doc)
    }

    /// Build a document from definitions, enforcing the same rules as
    /// [`load`](Self::load): at least one field, non-empty unique names.
    ///
    /// # Errors
    ///
    /// - `SchemaError::Malformed` for an empty list or an empty name.
    /// - `SchemaError::DuplicateField` on the first repeated name.
    pub fn from_fields(fields: Vec<FieldDefinition>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::malformed("", "schema has no fields"));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if f.name.is_empty() {
                return Err(SchemaError::malformed(
                    format!("/{i}/name"),
                    "field name must not be empty",
                ));
            }
            if !seen.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    name: f.name.clone(),
                });
            }
        }
        Ok(Self { fields })
    }

    /// Field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Look up a definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Definitions marked `REQUIRED`, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical bare-array form: upper-case types, `mode` only on required
    /// fields. `load(to_json_string())` yields an equal document.
    pub fn to_json(&self) -> Value {
        Value::Array(self.fields.iter().map(FieldDefinition::to_value).collect())
    }

    /// Pretty-printed [`to_json`](Self::to_json).
    pub fn to_json_string(&self) -> String {
        // Serializing a `Value` to a string cannot fail.
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }
}

fn field_list_validator() -> Result<Validator, SchemaError> {
    let meta: Value = serde_json::from_str(FIELD_LIST_SCHEMA)
        .map_err(|e| SchemaError::malformed("", format!("field-list schema: {e}")))?;
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.build(&meta)
        .map_err(|e| SchemaError::malformed("", format!("field-list schema: {e}")))
}

fn check_structure(list: &Value, base: &str) -> Result<(), SchemaError> {
    let validator = field_list_validator()?;
    let first = validator
        .iter_errors(list)
        .next()
        .map(|e| (e.instance_path.to_string(), e.to_string()));
    match first {
        Some((pointer, reason)) => Err(SchemaError::malformed(format!("{base}{pointer}"), reason)),
        None => Ok(()),
    }
}
