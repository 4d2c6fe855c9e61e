use std::collections::BTreeMap;

use thiserror::Error;

use super::Document;

/// A field could not be read with the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The document (or the value holding `field`) is not a map
    #[error("expected a map while accessing `{field}`, found {found}")]
    NotAMap {
        /// Field that was being accessed
        field: String,
        /// Kind of the value that was found instead
        found: &'static str,
    },
    /// A required field is absent
    #[error("missing field `{field}`")]
    MissingField {
        /// Name of the absent field
        field: String,
    },
    /// A field holds a value of another kind
    #[error("field `{field}` should be {expected}, found {found}")]
    WrongType {
        /// Name of the field
        field: String,
        /// Expected kind
        expected: &'static str,
        /// Kind that was found
        found: &'static str,
    },
    /// Serialized text is not valid JSON
    #[error("invalid JSON: {message}")]
    InvalidJson {
        /// Parser message
        message: String,
    },
}

impl DocumentError {
    /// The field this error is about, `""` for whole-document parse errors.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::NotAMap { field, .. }
            | Self::MissingField { field }
            | Self::WrongType { field, .. } => field,
            Self::InvalidJson { .. } => "",
        }
    }

    fn wrong_type(field: &str, expected: &'static str, found: &Document) -> Self {
        Self::WrongType {
            field: field.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

impl Document {
    /// The value as an integer. Booleans read as 0/1 because SQLite stores them that way.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// The value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The value as a mutable list.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The value as a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// The value as a mutable map.
    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Self>> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Whether this is a map containing `field`.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Looks up `field` if this is a map.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Self> {
        self.as_map().and_then(|fields| fields.get(field))
    }

    /// Looks up a required field.
    ///
    /// # Errors
    /// `NotAMap` or `MissingField`.
    pub fn field(&self, field: &str) -> Result<&Self, DocumentError> {
        self.fields(field)?
            .get(field)
            .ok_or_else(|| DocumentError::MissingField {
                field: field.to_string(),
            })
    }

    /// Mutable access to a required field.
    ///
    /// # Errors
    /// `NotAMap` or `MissingField`.
    pub fn field_mut(&mut self, field: &str) -> Result<&mut Self, DocumentError> {
        self.fields_mut(field)?
            .get_mut(field)
            .ok_or_else(|| DocumentError::MissingField {
                field: field.to_string(),
            })
    }

    /// A required integer field.
    ///
    /// # Errors
    /// `NotAMap`, `MissingField` or `WrongType`.
    pub fn int_field(&self, field: &str) -> Result<i64, DocumentError> {
        let value = self.field(field)?;
        value
            .as_i64()
            .ok_or_else(|| DocumentError::wrong_type(field, "int", value))
    }

    /// An optional integer field; absent and `null` both read as `None`.
    ///
    /// # Errors
    /// `NotAMap` or `WrongType`.
    pub fn opt_int_field(&self, field: &str) -> Result<Option<i64>, DocumentError> {
        match self.fields(field)?.get(field) {
            None | Some(Self::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| DocumentError::wrong_type(field, "int", value)),
        }
    }

    /// A required string field.
    ///
    /// # Errors
    /// `NotAMap`, `MissingField` or `WrongType`.
    pub fn str_field(&self, field: &str) -> Result<&str, DocumentError> {
        let value = self.field(field)?;
        value
            .as_str()
            .ok_or_else(|| DocumentError::wrong_type(field, "string", value))
    }

    /// An optional string field; absent and `null` both read as `None`.
    ///
    /// # Errors
    /// `NotAMap` or `WrongType`.
    pub fn opt_str_field(&self, field: &str) -> Result<Option<&str>, DocumentError> {
        match self.fields(field)?.get(field) {
            None | Some(Self::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| DocumentError::wrong_type(field, "string", value)),
        }
    }

    /// A required list field.
    ///
    /// # Errors
    /// `NotAMap`, `MissingField` or `WrongType`.
    pub fn list_field(&self, field: &str) -> Result<&[Self], DocumentError> {
        let value = self.field(field)?;
        value
            .as_list()
            .ok_or_else(|| DocumentError::wrong_type(field, "list", value))
    }

    /// Mutable access to a required list field.
    ///
    /// # Errors
    /// `NotAMap`, `MissingField` or `WrongType`.
    pub fn list_field_mut(&mut self, field: &str) -> Result<&mut Vec<Self>, DocumentError> {
        let value = self.field_mut(field)?;
        let found = value.kind();
        value.as_list_mut().ok_or(DocumentError::WrongType {
            field: field.to_string(),
            expected: "list",
            found,
        })
    }

    /// Mutable access to a required map field.
    ///
    /// # Errors
    /// `NotAMap`, `MissingField` or `WrongType`.
    pub fn map_field_mut(&mut self, field: &str) -> Result<&mut Self, DocumentError> {
        let value = self.field_mut(field)?;
        if value.as_map().is_none() {
            return Err(DocumentError::wrong_type(field, "map", value));
        }
        Ok(value)
    }

    /// Inserts or replaces `field`.
    ///
    /// # Errors
    /// `NotAMap`.
    pub fn set(&mut self, field: &str, value: impl Into<Self>) -> Result<(), DocumentError> {
        self.fields_mut(field)?.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Removes `field`, returning its previous value.
    ///
    /// # Errors
    /// `NotAMap`.
    pub fn remove(&mut self, field: &str) -> Result<Option<Self>, DocumentError> {
        Ok(self.fields_mut(field)?.remove(field))
    }

    fn fields(&self, field: &str) -> Result<&BTreeMap<String, Self>, DocumentError> {
        self.as_map().ok_or_else(|| DocumentError::NotAMap {
            field: field.to_string(),
            found: self.kind(),
        })
    }

    fn fields_mut(&mut self, field: &str) -> Result<&mut BTreeMap<String, Self>, DocumentError> {
        let found = self.kind();
        self.as_map_mut().ok_or(DocumentError::NotAMap {
            field: field.to_string(),
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> Document {
        Document::parse(r#"{"type":"KEY_EVENT","data":"24","extras":[],"flags":2,"uid":null}"#)
            .unwrap()
    }

    #[test]
    fn test_typed_reads() {
        let action = action();
        assert_eq!(action.str_field("type").unwrap(), "KEY_EVENT");
        assert_eq!(action.int_field("flags").unwrap(), 2);
        assert!(action.list_field("extras").unwrap().is_empty());
        assert_eq!(action.opt_str_field("uid").unwrap(), None);
        assert_eq!(action.opt_int_field("missing").unwrap(), None);
    }

    #[test]
    fn test_errors_name_the_field() {
        let action = action();

        let err = action.int_field("type").unwrap_err();
        assert_eq!(
            err,
            DocumentError::WrongType {
                field: "type".to_string(),
                expected: "int",
                found: "string",
            }
        );
        assert_eq!(err.field(), "type");

        let err = action.list_field("constraints").unwrap_err();
        assert!(matches!(err, DocumentError::MissingField { ref field } if field == "constraints"));

        let err = Document::Int(1).field("flags").unwrap_err();
        assert!(matches!(err, DocumentError::NotAMap { found: "int", .. }));
    }

    #[test]
    fn test_bools_read_as_ints() {
        let doc = Document::parse(r#"{"is_enabled":true}"#).unwrap();
        assert_eq!(doc.int_field("is_enabled").unwrap(), 1);
    }

    #[test]
    fn test_set_and_remove() {
        let mut action = action();
        action.set("flags", 0).unwrap();
        assert_eq!(action.int_field("flags").unwrap(), 0);

        assert_eq!(action.remove("data").unwrap(), Some(Document::from("24")));
        assert!(!action.contains("data"));
        assert_eq!(action.remove("data").unwrap(), None);
    }

    #[test]
    fn test_list_field_mut_rejects_maps() {
        let mut doc = Document::parse(r#"{"trigger":{"keys":[]}}"#).unwrap();
        assert!(doc.list_field_mut("trigger").is_err());
        assert!(doc.map_field_mut("trigger").is_ok());
    }
}
