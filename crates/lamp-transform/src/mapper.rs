//! # Field Mapper
//!
//! Coerces a [`RawRecord`] into a [`TypedRecord`] using a column order and
//! the schema's declared types.
//!
//! ## Coercion Rules
//!
//! | Type | Accepted token |
//! |------|----------------|
//! | INTEGER | optional sign, base-10 digits, fits in 64 bits |
//! | NUMERIC | optional sign, digits, optional `.digits`; kept exact |
//! | BOOLEAN | `true` / `false`, any case |
//! | DATE | `YYYY-MM-DD`, a real calendar date |
//! | GEOGRAPHY | `POINT(lon lat)` or `lat,lon` |
//! | STRING | anything, including empty |
//!
//! An empty token for any type other than STRING is `Null`; whether that is
//! acceptable is the validator's decision.
//!
//! ## Split Geography Columns
//!
//! Comma-separated input cannot carry an unquoted `lat,lon` pair in one
//! column, so a GEOGRAPHY field may be named by two adjacent columns. The
//! first is read as latitude and the second as longitude.

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::NaiveDate;

use lamp_core::{
    ColumnMappingError, Decimal, FieldType, GeoPoint, MapError, RawRecord, TypedRecord, TypedValue,
};
use lamp_schema::SchemaDocument;

/// One output field and the number of input columns it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    name: String,
    field_type: FieldType,
    span: usize,
}

/// A column order checked against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<String>,
    targets: Vec<Target>,
}

impl ColumnMapping {
    /// Check `columns` against `schema`.
    ///
    /// # Errors
    ///
    /// - `ColumnMappingError::Empty` for an empty column list.
    /// - `ColumnMappingError::UnknownField` if a column names no schema field.
    /// - `ColumnMappingError::DuplicateColumn` if a field appears twice, other
    ///   than a GEOGRAPHY field in exactly two adjacent columns.
    pub fn new<S: AsRef<str>>(
        columns: &[S],
        schema: &SchemaDocument,
    ) -> Result<Self, ColumnMappingError> {
        if columns.is_empty() {
            return Err(ColumnMappingError::Empty);
        }

        let mut targets: Vec<Target> = Vec::with_capacity(columns.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());

        for (i, column) in columns.iter().enumerate() {
            let name = column.as_ref();
            let def = schema
                .field(name)
                .ok_or_else(|| ColumnMappingError::UnknownField {
                    position: i + 1,
                    name: name.to_string(),
                })?;

            if let Some(last) = targets.last_mut() {
                if last.name == name && last.span == 1 && last.field_type == FieldType::Geography {
                    last.span = 2;
                    continue;
                }
            }
            if !seen.insert(name) {
                return Err(ColumnMappingError::DuplicateColumn {
                    name: name.to_string(),
                });
            }
            targets.push(Target {
                name: name.to_string(),
                field_type: def.field_type(),
                span: 1,
            });
        }

        Ok(Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            targets,
        })
    }

    /// One column per schema field, in declaration order.
    pub fn from_schema(schema: &SchemaDocument) -> Self {
        let targets: Vec<Target> = schema
            .fields()
            .iter()
            .map(|f| Target {
                name: f.name().to_string(),
                field_type: f.field_type(),
                span: 1,
            })
            .collect();
        Self {
            columns: targets.iter().map(|t| t.name.clone()).collect(),
            targets,
        }
    }

    /// The column names as given.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of input columns a record must have.
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Coerces raw records under a fixed column mapping.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    mapping: ColumnMapping,
}

impl FieldMapper {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Coerce one raw record.
    ///
    /// # Errors
    ///
    /// - `MapError::ColumnCountMismatch` if the token count differs from the
    ///   mapping width. No coercion is attempted in that case.
    /// - `MapError::TypeMismatch` for the first token that does not coerce.
    pub fn map(&self, raw: &RawRecord) -> Result<TypedRecord, MapError> {
        let width = self.mapping.width();
        if raw.len() != width {
            return Err(MapError::ColumnCountMismatch {
                expected: width,
                found: raw.len(),
            });
        }

        let tokens = raw.tokens();
        let mut record = TypedRecord::with_capacity(self.mapping.targets.len());
        let mut pos = 0;
        for target in &self.mapping.targets {
            let token: Cow<'_, str> = if target.span == 2 {
                let (lat, lon) = (&tokens[pos], &tokens[pos + 1]);
                if lat.is_empty() && lon.is_empty() {
                    Cow::Borrowed("")
                } else {
                    Cow::Owned(format!("{lat},{lon}"))
                }
            } else {
                Cow::Borrowed(tokens[pos].as_str())
            };
            pos += target.span;

            let value = coerce(&token, target.field_type).map_err(|reason| MapError::TypeMismatch {
                field: target.name.clone(),
                expected: target.field_type,
                token: token.to_string(),
                reason,
            })?;
            record.insert(target.name.as_str(), value);
        }
        Ok(record)
    }
}

/// Coerce a single token to `field_type`.
pub fn coerce(token: &str, field_type: FieldType) -> Result<TypedValue, String> {
    if field_type == FieldType::String {
        return Ok(TypedValue::String(token.to_string()));
    }
    if token.is_empty() {
        return Ok(TypedValue::Null);
    }
    match field_type {
        FieldType::Integer => coerce_integer(token).map(TypedValue::Integer),
        FieldType::Numeric => token
            .parse::<Decimal>()
            .map(TypedValue::Numeric)
            .map_err(|e| e.to_string()),
        FieldType::Boolean => coerce_boolean(token).map(TypedValue::Boolean),
        FieldType::Date => coerce_date(token).map(TypedValue::Date),
        FieldType::Geography => token
            .parse::<GeoPoint>()
            .map(TypedValue::Geography)
            .map_err(|e| e.to_string()),
        FieldType::String => Ok(TypedValue::String(token.to_string())),
    }
}

fn coerce_integer(token: &str) -> Result<i64, String> {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err("not a base-10 integer".to_string());
    }
    token
        .parse::<i64>()
        .map_err(|_| "out of range for a 64-bit integer".to_string())
}

fn coerce_boolean(token: &str) -> Result<bool, String> {
    if token.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if token.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err("expected true or false".to_string())
    }
}

fn coerce_date(token: &str) -> Result<NaiveDate, String> {
    let b = token.as_bytes();
    let shaped = b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !shaped {
        return Err("expected YYYY-MM-DD".to_string());
    }
    NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| "not a calendar date".to_string())
}
