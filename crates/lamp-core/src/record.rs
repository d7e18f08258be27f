//! # Records — Raw Tokens and Typed Fields
//!
//! A [`RawRecord`] is what the parser produces from one input line: the line
//! number and its tokens in position order. A [`TypedRecord`] is what the
//! mapper produces from it: named, typed values in column order.
//!
//! Neither outlives the batch that created it.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::TypedValue;

/// Untyped, position-ordered tokens from one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    line: usize,
    tokens: Vec<String>,
}

impl RawRecord {
    pub fn new(line: usize, tokens: Vec<String>) -> Self {
        Self { line, tokens }
    }

    /// 1-based physical line number in the input.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

/// Named, typed values in insertion order.
///
/// Field names are unique: inserting an existing name replaces its value in
/// place. Serializes as a JSON object with keys in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRecord {
    fields: Vec<(String, TypedValue)>,
}

impl TypedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Set `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: TypedValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// True if `name` is present with a non-null value.
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_accessors() {
        let raw = RawRecord::new(3, vec!["a".into(), "b".into()]);
        assert_eq!(raw.line(), 3);
        assert_eq!(raw.len(), 2);
        assert!(!raw.is_empty());
        assert_eq!(raw.tokens()[1], "b");
        assert_eq!(raw.into_tokens(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut rec = TypedRecord::new();
        rec.insert("a", TypedValue::Integer(1));
        rec.insert("b", TypedValue::Integer(2));
        rec.insert("a", TypedValue::Integer(3));
        assert_eq!(rec.len(), 2);
        let names: Vec<&str> = rec.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(rec.get("a"), Some(&TypedValue::Integer(3)));
    }

    #[test]
    fn has_value_treats_null_as_absent() {
        let mut rec = TypedRecord::new();
        rec.insert("present", TypedValue::String(String::new()));
        rec.insert("null", TypedValue::Null);
        assert!(rec.has_value("present"));
        assert!(!rec.has_value("null"));
        assert!(!rec.has_value("missing"));
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut rec = TypedRecord::new();
        rec.insert("zeta", TypedValue::Integer(1));
        rec.insert("alpha", TypedValue::Boolean(false));
        rec.insert("mid", TypedValue::Null);
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":false,"mid":null}"#);
    }
}
