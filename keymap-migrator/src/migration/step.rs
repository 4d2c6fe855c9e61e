use thiserror::Error;

use crate::document::{Document, DocumentError};
use crate::migration::cross_reference::DeviceNameSnapshot;

/// A transform that maps one document to one document.
pub type DocumentTransform = fn(Document, &StepContext<'_>) -> Result<Document, TransformError>;

/// A transform that may split one record into several.
pub type ExpandTransform =
    fn(Document, &StepContext<'_>) -> Result<Vec<Document>, TransformError>;

/// Why a single transform failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A field was missing or had the wrong shape
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// A field was readable but holds a value the step cannot migrate
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl TransformError {
    /// Builds an `Invalid` error.
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The offending field, empty when unknown.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Document(e) => e.field(),
            Self::Invalid { field, .. } => field,
        }
    }
}

/// Read-only context handed to every transform.
///
/// Transforms must not depend on anything else: no clock, no randomness, no storage.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Storage primary key of the record, when it has one. Never written back by a step.
    pub record_id: Option<i64>,
    /// Storage key of a preference-backed record (e.g. the gesture id `swipe_down`).
    pub record_key: Option<&'a str>,
    /// Device descriptor to name lookup captured before the step started.
    pub device_names: &'a DeviceNameSnapshot,
}

impl<'a> StepContext<'a> {
    /// A context for a record without storage identity.
    #[must_use]
    pub const fn detached(device_names: &'a DeviceNameSnapshot) -> Self {
        Self {
            record_id: None,
            record_key: None,
            device_names,
        }
    }

    /// Sets the storage primary key.
    #[must_use]
    pub const fn with_record_id(mut self, record_id: Option<i64>) -> Self {
        self.record_id = record_id;
        self
    }

    /// Sets the preference key.
    #[must_use]
    pub const fn with_record_key(mut self, record_key: &'a str) -> Self {
        self.record_key = Some(record_key);
        self
    }
}

/// Anything that moves a record from one schema version to a later one.
pub trait VersionedStep: Send + Sync {
    /// The only version this step accepts as input.
    fn version_before(&self) -> u32;
    /// The version its output conforms to. Always greater than `version_before`.
    fn version_after(&self) -> u32;
    /// Short description used in logs.
    fn name(&self) -> &str;
}

/// How a step rewrites a document.
#[derive(Clone, Copy)]
pub enum StepTransform {
    /// One document in, one document out
    Document(DocumentTransform),
    /// One document in, one or more documents out
    Expand(ExpandTransform),
}

impl StepTransform {
    /// Applies the transform, normalizing the output to a list.
    ///
    /// # Errors
    /// Whatever the transform reports.
    pub fn apply(
        &self,
        document: Document,
        context: &StepContext<'_>,
    ) -> Result<Vec<Document>, TransformError> {
        match self {
            Self::Document(transform) => transform(document, context).map(|doc| vec![doc]),
            Self::Expand(transform) => transform(document, context),
        }
    }
}

impl std::fmt::Debug for StepTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(_) => f.write_str("Document"),
            Self::Expand(_) => f.write_str("Expand"),
        }
    }
}

/// One atomic document transformation between two schema versions.
#[derive(Debug, Clone)]
pub struct MigrationStep {
    version_before: u32,
    version_after: u32,
    name: &'static str,
    transform: StepTransform,
}

#[allow(clippy::unnecessary_wraps)]
fn unchanged(document: Document, _context: &StepContext<'_>) -> Result<Document, TransformError> {
    Ok(document)
}

impl MigrationStep {
    /// A one-to-one step.
    #[must_use]
    pub const fn new(
        version_before: u32,
        version_after: u32,
        name: &'static str,
        transform: DocumentTransform,
    ) -> Self {
        Self {
            version_before,
            version_after,
            name,
            transform: StepTransform::Document(transform),
        }
    }

    /// A step that may split one record into several.
    #[must_use]
    pub const fn expanding(
        version_before: u32,
        version_after: u32,
        name: &'static str,
        transform: ExpandTransform,
    ) -> Self {
        Self {
            version_before,
            version_after,
            name,
            transform: StepTransform::Expand(transform),
        }
    }

    /// A version bump that leaves documents untouched, e.g. when only DDL changed.
    #[must_use]
    pub const fn unchanged(version_before: u32, version_after: u32, name: &'static str) -> Self {
        Self::new(version_before, version_after, name, unchanged)
    }

    /// The step's transform.
    #[must_use]
    pub const fn transform(&self) -> StepTransform {
        self.transform
    }
}

impl VersionedStep for MigrationStep {
    fn version_before(&self) -> u32 {
        self.version_before
    }

    fn version_after(&self) -> u32 {
        self.version_after
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump_flags(mut doc: Document, _: &StepContext<'_>) -> Result<Document, TransformError> {
        let flags = doc.int_field("flags")?;
        doc.set("flags", flags + 1)?;
        Ok(doc)
    }

    fn split(doc: Document, _: &StepContext<'_>) -> Result<Vec<Document>, TransformError> {
        Ok(vec![doc.clone(), doc])
    }

    #[test]
    fn test_document_transform_yields_one_document() {
        let snapshot = DeviceNameSnapshot::default();
        let step = MigrationStep::new(1, 2, "bump", bump_flags);
        let out = step
            .transform()
            .apply(Document::parse(r#"{"flags":1}"#).unwrap(), &StepContext::detached(&snapshot))
            .unwrap();
        assert_eq!(out, vec![Document::parse(r#"{"flags":2}"#).unwrap()]);
    }

    #[test]
    fn test_expand_transform_yields_all_documents() {
        let snapshot = DeviceNameSnapshot::default();
        let step = MigrationStep::expanding(1, 2, "split", split);
        let out = step
            .transform()
            .apply(Document::map(), &StepContext::detached(&snapshot))
            .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_transform_error_exposes_field() {
        let snapshot = DeviceNameSnapshot::default();
        let step = MigrationStep::new(1, 2, "bump", bump_flags);
        let err = step
            .transform()
            .apply(Document::map(), &StepContext::detached(&snapshot))
            .unwrap_err();
        assert_eq!(err.field(), "flags");
        assert_eq!(TransformError::invalid("type", "blank").field(), "type");
    }
}
