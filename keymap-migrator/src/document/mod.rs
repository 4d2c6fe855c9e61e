//! The structured document model.
//!
//! Every migration step works on a [`Document`]: a JSON-shaped tree that is decoded from a
//! record's serialized fields, transformed, and encoded back. Steps never see concrete
//! versioned types; they use the named accessors on `Document` so that a missing or
//! mistyped field surfaces as a [`DocumentError`] naming that field.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

mod access;
mod extras;

pub use access::DocumentError;
pub use extras::{extra_data, remove_extra, set_extra};

/// A loosely typed tree holding one record's fields.
///
/// Maps are ordered by key, so encoding is deterministic regardless of the order in which
/// steps inserted fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// JSON `null`, also used for SQL `NULL` columns
    Null,
    /// A boolean
    Bool(bool),
    /// An integer
    Int(i64),
    /// A non-integral number
    Float(f64),
    /// A string
    String(String),
    /// An ordered list
    List(Vec<Document>),
    /// A nested document
    Map(BTreeMap<String, Document>),
}

impl Document {
    /// An empty map.
    #[must_use]
    pub const fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Builds a map from `(key, value)` pairs.
    #[must_use]
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Parses JSON text.
    ///
    /// # Errors
    /// `DocumentError::InvalidJson` if `json` is not valid JSON, or holds an integer outside
    /// the `i64` range.
    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        let value =
            serde_json::from_str::<Value>(json).map_err(|e| DocumentError::InvalidJson {
                message: e.to_string(),
            })?;
        if let Some(n) = oversized_integer(&value) {
            return Err(DocumentError::InvalidJson {
                message: format!("integer {n} does not fit in a signed 64-bit value"),
            });
        }
        Ok(Self::from(value))
    }

    /// Encodes as compact JSON with sorted keys.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        Value::from(self).to_string()
    }

    /// A short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

/// The first unsigned integer in `value` that `i64` cannot hold.
fn oversized_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) if n.is_u64() && n.as_i64().is_none() => n.as_u64(),
        Value::Array(items) => items.iter().find_map(oversized_integer),
        Value::Object(fields) => fields.values().find_map(oversized_integer),
        _ => None,
    }
}

/// Lossy for integers above `i64::MAX`, which become `Float`. [`Document::parse`] rejects
/// those instead.
impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => {
                Self::Map(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&Document> for Value {
    fn from(document: &Document) -> Self {
        match document {
            Document::Null => Self::Null,
            Document::Bool(b) => Self::Bool(*b),
            Document::Int(i) => Self::Number((*i).into()),
            // JSON has no NaN or infinity
            Document::Float(f) => Number::from_f64(*f).map_or(Self::Null, Self::Number),
            Document::String(s) => Self::String(s.clone()),
            Document::List(items) => Self::Array(items.iter().map(Self::from).collect()),
            Document::Map(fields) => Self::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Document {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for Document {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Self>> for Document {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_sorts_keys() {
        let doc = Document::parse(r#"{"mode":1,"keys":[],"extras":[]}"#).unwrap();
        assert_eq!(doc.to_json_string(), r#"{"extras":[],"keys":[],"mode":1}"#);
    }

    #[test]
    fn test_integers_stay_integers() {
        let doc = Document::parse(r#"{"flags":16,"delay":2.5,"big":-9007199254740993}"#).unwrap();
        assert_eq!(doc.get("flags"), Some(&Document::Int(16)));
        assert_eq!(doc.get("delay"), Some(&Document::Float(2.5)));
        assert_eq!(doc.get("big"), Some(&Document::Int(-9_007_199_254_740_993)));
        assert_eq!(
            doc.to_json_string(),
            r#"{"big":-9007199254740993,"delay":2.5,"flags":16}"#
        );
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = Document::parse("{invalid").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidJson { .. }));
    }

    #[test]
    fn test_integers_beyond_i64_are_rejected() {
        let err = Document::parse(r#"{"extras":[{"data":9223372036854775808}]}"#).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::InvalidJson { message } if message.contains("9223372036854775808")
        ));
        assert_eq!(
            Document::parse("9223372036854775807").unwrap(),
            Document::Int(i64::MAX)
        );
    }

    #[test]
    fn test_nan_encodes_as_null() {
        assert_eq!(Document::Float(f64::NAN).to_json_string(), "null");
    }

    #[test]
    fn test_from_pairs_builds_map() {
        let doc = Document::from_pairs([("id", Document::from("extra_device_name")), ("data", "".into())]);
        assert_eq!(doc.to_json_string(), r#"{"data":"","id":"extra_device_name"}"#);
    }
}
