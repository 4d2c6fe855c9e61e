use std::collections::BTreeMap;

use thiserror::Error;

use crate::document::Document;
use crate::primitives::database::MigrationDatabase;

/// Descriptor column of the device info table.
pub const DESCRIPTOR_COLUMN: &str = "descriptor";
/// Name column of the device info table.
pub const NAME_COLUMN: &str = "name";

/// Immutable device descriptor to display name lookup.
///
/// Captured once per step before any record is transformed, so every record of the step sees
/// the same names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceNameSnapshot {
    names: BTreeMap<String, String>,
}

impl DeviceNameSnapshot {
    /// An empty snapshot; every lookup yields `""`.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Builds a snapshot. On duplicate descriptors the last name wins.
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            names: pairs
                .into_iter()
                .map(|(descriptor, name)| (descriptor.into(), name.into()))
                .collect(),
        }
    }

    /// The name for `descriptor`, or `""` when unknown.
    #[must_use]
    pub fn name_for(&self, descriptor: &str) -> &str {
        self.names.get(descriptor).map_or("", String::as_str)
    }

    /// Number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no device is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The lookup source could not be read at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrossReferenceError {
    /// The source is missing or unreadable
    #[error("cross reference `{origin}` unavailable: {message}")]
    Unavailable {
        /// Table or backup section that was read
        origin: String,
        /// Underlying failure
        message: String,
    },
}

/// A source of device names.
pub trait CrossReferenceProvider {
    /// Table or backup section the names come from.
    fn origin(&self) -> &str;

    /// Reads the full lookup.
    ///
    /// # Errors
    /// `CrossReferenceError::Unavailable` if the source cannot be read.
    fn snapshot(&self) -> Result<DeviceNameSnapshot, CrossReferenceError>;
}

/// Names stored in a `(descriptor, name)` table of the database being migrated.
pub struct DeviceInfoTable<'a> {
    database: &'a dyn MigrationDatabase,
    table: &'a str,
}

impl<'a> DeviceInfoTable<'a> {
    /// A provider reading `table`.
    #[must_use]
    pub const fn new(database: &'a dyn MigrationDatabase, table: &'a str) -> Self {
        Self { database, table }
    }
}

impl CrossReferenceProvider for DeviceInfoTable<'_> {
    fn origin(&self) -> &str {
        self.table
    }

    fn snapshot(&self) -> Result<DeviceNameSnapshot, CrossReferenceError> {
        let pairs = self
            .database
            .read_pairs(
                self.table.to_string(),
                DESCRIPTOR_COLUMN.to_string(),
                NAME_COLUMN.to_string(),
            )
            .map_err(|e| CrossReferenceError::Unavailable {
                origin: self.table.to_string(),
                message: e.to_string(),
            })?;

        Ok(DeviceNameSnapshot::from_pairs(
            pairs
                .into_iter()
                .map(|pair| (pair.key, pair.value.unwrap_or_default())),
        ))
    }
}

/// Names carried inside a backup as a list of `{"descriptor": .., "name": ..}` documents.
pub struct DeviceInfoList<'a> {
    origin: &'a str,
    entries: Option<&'a Document>,
}

impl<'a> DeviceInfoList<'a> {
    /// A provider over the backup field `origin`, which may be absent.
    #[must_use]
    pub const fn new(origin: &'a str, entries: Option<&'a Document>) -> Self {
        Self { origin, entries }
    }
}

impl CrossReferenceProvider for DeviceInfoList<'_> {
    fn origin(&self) -> &str {
        self.origin
    }

    fn snapshot(&self) -> Result<DeviceNameSnapshot, CrossReferenceError> {
        let Some(entries) = self.entries else {
            return Ok(DeviceNameSnapshot::empty());
        };
        let entries = entries
            .as_list()
            .ok_or_else(|| CrossReferenceError::Unavailable {
                origin: self.origin.to_string(),
                message: format!("expected a list, found {}", entries.kind()),
            })?;

        // entries without a descriptor cannot be referenced, skip them
        Ok(DeviceNameSnapshot::from_pairs(entries.iter().filter_map(
            |entry| {
                let descriptor = entry.get(DESCRIPTOR_COLUMN)?.as_str()?;
                let name = entry
                    .get(NAME_COLUMN)
                    .and_then(Document::as_str)
                    .unwrap_or_default();
                Some((descriptor, name))
            },
        )))
    }
}

/// Captures a snapshot, degrading to an empty one when the source is unavailable.
///
/// An unavailable source only means device names fall back to `""`; it never fails a step.
pub fn resolve_snapshot(provider: &dyn CrossReferenceProvider) -> DeviceNameSnapshot {
    match provider.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            crate::warn!(
                "cross_reference.unavailable origin={} error={}",
                provider.origin(),
                e
            );
            DeviceNameSnapshot::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::database::{InMemoryMigrationDatabase, SqlValue};

    fn text(value: &str) -> SqlValue {
        SqlValue::Text {
            value: value.to_string(),
        }
    }

    #[test]
    fn test_table_snapshot() {
        let db = InMemoryMigrationDatabase::new(11);
        db.run_statement("CREATE TABLE `deviceinfo` (`descriptor` TEXT NOT NULL)".to_string())
            .unwrap();
        db.insert(
            "deviceinfo",
            1,
            &[("descriptor", text("bluetooth_device")), ("name", text("Pixel Buds"))],
        );
        db.insert("deviceinfo", 2, &[("descriptor", text("no_name"))]);

        let snapshot = resolve_snapshot(&DeviceInfoTable::new(&db, "deviceinfo"));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.name_for("bluetooth_device"), "Pixel Buds");
        assert_eq!(snapshot.name_for("no_name"), "");
        assert_eq!(snapshot.name_for("unknown"), "");
    }

    #[test]
    fn test_missing_table_yields_empty_snapshot() {
        let db = InMemoryMigrationDatabase::new(11);
        let provider = DeviceInfoTable::new(&db, "deviceinfo");

        assert!(matches!(
            provider.snapshot(),
            Err(CrossReferenceError::Unavailable { .. })
        ));
        assert!(resolve_snapshot(&provider).is_empty());
    }

    #[test]
    fn test_backup_list_snapshot() {
        let entries = Document::parse(
            r#"[{"descriptor":"keyboard","name":"Keychron"},{"name":"orphan"},{"descriptor":"x","name":"a"},{"descriptor":"x","name":"b"}]"#,
        )
        .unwrap();

        let snapshot = resolve_snapshot(&DeviceInfoList::new("device_info", Some(&entries)));
        assert_eq!(snapshot.name_for("keyboard"), "Keychron");
        assert_eq!(snapshot.name_for("x"), "b");
        assert_eq!(snapshot.len(), 2);

        assert!(resolve_snapshot(&DeviceInfoList::new("device_info", None)).is_empty());
        assert!(resolve_snapshot(&DeviceInfoList::new("device_info", Some(&Document::Int(1)))).is_empty());
    }
}
