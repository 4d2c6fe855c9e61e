//! Restoring key maps and fingerprint maps from a backup file.
//!
//! A backup is a JSON object holding the version of the database that wrote it, its key maps in
//! backup form (camel case field names), its fingerprint maps and the device list that was
//! current at the time. Everything is migrated to the current version in memory; the host
//! inserts the results.

use chrono::Utc;
use uuid::Uuid;

use crate::document::{Document, DocumentError};
use crate::families::fingerprint::{self, FINGERPRINT_VERSION, LEGACY_GESTURES, PREFERENCE_VERSION};
use crate::families::keymap::schema::columns;
use crate::families::keymap::KEYMAP_DATABASE_VERSION;
use crate::migration::cross_reference::{resolve_snapshot, DeviceInfoList, DeviceNameSnapshot};
use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::executor;
use crate::migration::registry::MigrationRegistry;
use crate::migration::step::{MigrationStep, StepContext};

/// Database version that wrote the backup.
const VERSION_FIELD: &str = "keymap_db_version";
const KEYMAP_LIST: &str = "keymap_list";
const FINGERPRINT_MAP_LIST: &str = "fingerprint_map_list";
const DEVICE_INFO: &str = "device_info";

/// Backups started recording their version at 10.
pub const UNVERSIONED_BACKUP_VERSION: u32 = 9;

/// First version whose backups hold `fingerprint_map_list`.
const FINGERPRINT_MAP_LIST_VERSION: u32 = 12;

/// Backup field names of a key map and the columns they correspond to. Fields not listed are
/// named the same in both.
const KEYMAP_FIELDS: &[(&str, &str)] = &[
    ("actionList", columns::ACTION_LIST),
    ("constraintList", columns::CONSTRAINT_LIST),
    ("constraintMode", columns::CONSTRAINT_MODE),
    ("folderName", columns::FOLDER_NAME),
    ("isEnabled", columns::IS_ENABLED),
];

/// Records migrated out of a backup, serialized as JSON and ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct RestoredBackup {
    /// Version the backup was written at
    pub backup_version: u32,
    /// Key maps in backup form, without `id` and with a fresh `uid`
    pub keymaps: Vec<String>,
    /// Fingerprint maps at the current version
    pub fingerprint_maps: Vec<String>,
}

fn rename_fields<'a>(
    mut document: Document,
    renames: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<Document, DocumentError> {
    for (from, to) in renames {
        if let Some(value) = document.remove(from)? {
            document.set(to, value)?;
        }
    }
    Ok(document)
}

fn list<'a>(root: &'a Document, field: &str) -> MigrationResult<&'a [Document]> {
    match root.get(field) {
        None | Some(Document::Null) => Ok(&[]),
        Some(value) => value.as_list().ok_or_else(|| MigrationError::JsonError {
            message: format!("`{field}` should be a list, found {}", value.kind()),
        }),
    }
}

fn backup_version(root: &Document) -> MigrationResult<u32> {
    match root.opt_int_field(VERSION_FIELD)? {
        None => Ok(UNVERSIONED_BACKUP_VERSION),
        Some(version) => u32::try_from(version).map_err(|_| MigrationError::JsonError {
            message: format!("`{VERSION_FIELD}` out of range: {version}"),
        }),
    }
}

/// Migrates the contents of a backup with the given registries.
pub struct BackupRestorer<'a> {
    keymaps: &'a MigrationRegistry<MigrationStep>,
    fingerprint_maps: &'a MigrationRegistry<MigrationStep>,
}

impl<'a> BackupRestorer<'a> {
    /// A restorer using the key map and fingerprint map document registries.
    #[must_use]
    pub const fn new(
        keymaps: &'a MigrationRegistry<MigrationStep>,
        fingerprint_maps: &'a MigrationRegistry<MigrationStep>,
    ) -> Self {
        Self {
            keymaps,
            fingerprint_maps,
        }
    }

    /// Parses and migrates a backup.
    ///
    /// # Errors
    /// - `JsonError` if the backup is not a JSON object or a list has the wrong shape
    /// - `BackupVersionTooNew` if the backup, or one of its legacy fingerprint maps, was
    ///   written by a newer build
    /// - `DocumentTransformFailure` for the first record that fails to migrate
    pub fn restore(&self, json: &str) -> MigrationResult<RestoredBackup> {
        let root = Document::parse(json)?;
        if root.as_map().is_none() {
            return Err(MigrationError::JsonError {
                message: format!("backup should be an object, found {}", root.kind()),
            });
        }

        let backup_version = backup_version(&root)?;
        if backup_version > KEYMAP_DATABASE_VERSION {
            return Err(MigrationError::BackupVersionTooNew {
                backup_version,
                supported: KEYMAP_DATABASE_VERSION,
            });
        }

        let snapshot = resolve_snapshot(&DeviceInfoList::new(DEVICE_INFO, root.get(DEVICE_INFO)));

        let keymaps = list(&root, KEYMAP_LIST)?
            .iter()
            .map(|keymap| self.restore_keymap(keymap.clone(), backup_version, &snapshot))
            .collect::<MigrationResult<Vec<_>>>()?;

        let fingerprint_maps = if backup_version >= FINGERPRINT_MAP_LIST_VERSION
            && root.contains(FINGERPRINT_MAP_LIST)
        {
            list(&root, FINGERPRINT_MAP_LIST)?
                .iter()
                .map(|map| {
                    self.restore_fingerprint_map(map.clone(), backup_version, &StepContext::detached(&snapshot))
                })
                .collect::<MigrationResult<Vec<_>>>()?
        } else {
            self.restore_legacy_fingerprint_maps(&root, &snapshot)?
        };

        crate::info!(
            "backup.restored version={} keymaps={} fingerprint_maps={} devices={} timestamp={}",
            backup_version,
            keymaps.len(),
            fingerprint_maps.len(),
            snapshot.len(),
            Utc::now().to_rfc3339()
        );

        Ok(RestoredBackup {
            backup_version,
            keymaps,
            fingerprint_maps,
        })
    }

    fn restore_keymap(
        &self,
        keymap: Document,
        version: u32,
        snapshot: &DeviceNameSnapshot,
    ) -> MigrationResult<String> {
        let row = rename_fields(keymap, KEYMAP_FIELDS.iter().copied())?;
        let migrated = executor::migrate(
            self.keymaps,
            version,
            KEYMAP_DATABASE_VERSION,
            row,
            &StepContext::detached(snapshot),
        )?;

        let mut restored = rename_fields(
            migrated,
            KEYMAP_FIELDS.iter().map(|(field, column)| (*column, *field)),
        )?;
        restored.remove(columns::ID)?;
        restored.set(columns::UID, Uuid::new_v4().to_string())?;
        Ok(restored.to_json_string())
    }

    fn restore_fingerprint_map(
        &self,
        map: Document,
        version: u32,
        context: &StepContext<'_>,
    ) -> MigrationResult<String> {
        let migrated =
            executor::migrate(self.fingerprint_maps, version, FINGERPRINT_VERSION, map, context)?;
        Ok(migrated.to_json_string())
    }

    /// Backups older than 12 store each gesture under `fingerprint_{gesture}`, each with its own
    /// preference version.
    fn restore_legacy_fingerprint_maps(
        &self,
        root: &Document,
        snapshot: &DeviceNameSnapshot,
    ) -> MigrationResult<Vec<String>> {
        let mut restored = Vec::new();
        for (gesture, _) in LEGACY_GESTURES {
            let map = match root.get(&format!("fingerprint_{gesture}")) {
                None | Some(Document::Null) => continue,
                Some(map) => map.clone(),
            };
            let version = fingerprint::stored_version(&map)?;
            if version > PREFERENCE_VERSION {
                return Err(MigrationError::BackupVersionTooNew {
                    backup_version: version,
                    supported: PREFERENCE_VERSION,
                });
            }
            let context = StepContext::detached(snapshot).with_record_key(gesture);
            restored.push(self.restore_fingerprint_map(map, version, &context)?);
        }
        Ok(restored)
    }
}
