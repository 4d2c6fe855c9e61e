use crate::document::Document;
use crate::families::fingerprint::{
    self, LegacyFingerprintImport, FINGERPRINT_FAMILY, LEGACY_GESTURES, PREFERENCE_VERSION,
};
use crate::families::keymap::{self, KEYMAP_DATABASE_VERSION, KEYMAP_FAMILY};
use crate::migration::backup::{BackupRestorer, RestoredBackup};
use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::registry::MigrationRegistry;
use crate::migration::state::MigrationRecord;
use crate::migration::step::MigrationStep;
use crate::migration::table::{RowImport, TableMigrationReport, TableMigrator, TableStep};
use crate::migrator_export;
use crate::primitives::database::MigrationDatabase;
use crate::primitives::preferences::PreferenceStore;
use chrono::Utc;
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

const MIGRATION_KEY_PREFIX: &str = "migration:";

/// Global lock to prevent concurrent migration runs across all controller instances.
///
/// Key map tables and preferences are shared process state, so two controllers over the same
/// storage must never interleave their steps. The host should still keep a single controller
/// per process.
static MIGRATION_LOCK: Mutex<()> = Mutex::new(());

/// Takes the global lock without waiting.
fn try_lock_migrations() -> MigrationResult<MutexGuard<'static, ()>> {
    match MIGRATION_LOCK.try_lock() {
        Ok(guard) => Ok(guard),
        // steps are transactional, so a panicked run left nothing half-written
        Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => Err(MigrationError::InvalidOperation(
            "Migration is already in progress. Please wait for the current migration to complete."
                .to_string(),
        )),
    }
}

/// Summary of a migration run
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MigrationRunSummary {
    /// Number of record families checked
    pub total: u32,
    /// Families that ran at least one step
    pub migrated: u32,
    /// Families already at their current version
    pub up_to_date: u32,
    /// Key map table outcome; no steps when the table was current
    pub keymaps: TableMigrationReport,
    /// Fingerprint gesture preferences rewritten during this run
    pub fingerprint_maps_migrated: u32,
}

/// Host entry point that brings persisted key maps and fingerprint maps up to date.
///
/// ## Run records
///
/// Each family's last attempt is stored as a JSON [`MigrationRecord`] in the
/// [`PreferenceStore`] under `migration:{family}`:
/// - `migration:keymap`
/// - `migration:fingerprint-gesture-map`
///
/// Records only explain what happened. Whether a step runs is decided by the stored schema
/// version alone, so losing a record never re-runs a step.
#[derive(uniffi::Object)]
pub struct MigrationController {
    database: Arc<dyn MigrationDatabase>,
    preferences: Arc<dyn PreferenceStore>,
    keymaps: MigrationRegistry<MigrationStep>,
    keymap_table: MigrationRegistry<TableStep>,
    fingerprint_maps: Arc<MigrationRegistry<MigrationStep>>,
}

#[migrator_export]
impl MigrationController {
    /// Create a new [`MigrationController`] over the host's key map database and preferences.
    ///
    /// # Errors
    /// `InvalidRegistry` if the built-in step lists are inconsistent.
    #[uniffi::constructor]
    pub fn new(
        database: Arc<dyn MigrationDatabase>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Result<Arc<Self>, MigrationError> {
        let fingerprint_maps = Arc::new(fingerprint::document_registry()?);
        let legacy_import: Arc<dyn RowImport> = Arc::new(LegacyFingerprintImport::new(
            Arc::clone(&preferences),
            Arc::clone(&fingerprint_maps),
        ));

        Ok(Arc::new(Self {
            keymaps: keymap::document_registry()?,
            keymap_table: keymap::table_registry(&legacy_import)?,
            fingerprint_maps,
            database,
            preferences,
        }))
    }

    /// Migrates the key map table and the fingerprint gesture preferences to the current
    /// versions.
    ///
    /// The two families run on separate threads. Each table step commits on its own, so an
    /// interrupted run resumes from the last committed version.
    ///
    /// # Concurrency
    ///
    /// Fail-fast: if another run holds the global lock this returns `InvalidOperation`
    /// immediately instead of waiting.
    ///
    /// # Errors
    /// - `InvalidOperation` if a run is already in progress
    /// - the first family failure, after both families finished
    pub fn run_migrations(&self) -> Result<MigrationRunSummary, MigrationError> {
        let _guard = try_lock_migrations()?;
        self.run_all()
    }

    /// Migrates only the key map table to `target_version`.
    ///
    /// # Errors
    /// - `InvalidOperation` if a run is already in progress
    /// - chain resolution, row transform and database errors
    pub fn migrate_keymap_table(
        &self,
        target_version: u32,
    ) -> Result<TableMigrationReport, MigrationError> {
        let _guard = try_lock_migrations()?;
        TableMigrator::new(self.database.as_ref()).migrate_table(&self.keymap_table, target_version)
    }

    /// Reads a legacy fingerprint gesture map, migrating the stored preference on first read.
    ///
    /// `gesture_id` is the preference key (`swipe_down`, `swipe_up`, `swipe_left` or
    /// `swipe_right`). Returns `None` when nothing is stored.
    ///
    /// # Errors
    /// - `PreferenceStore` if the store fails
    /// - `JsonError`, `DowngradeUnsupported` or `DocumentTransformFailure` for a bad value,
    ///   which is then left untouched
    #[allow(clippy::needless_pass_by_value)] // uniffi hands over owned strings
    pub fn read_fingerprint_map(
        &self,
        gesture_id: String,
    ) -> Result<Option<String>, MigrationError> {
        let map = fingerprint::migrate_preference(
            self.preferences.as_ref(),
            &self.fingerprint_maps,
            &gesture_id,
        )?;
        Ok(map.as_ref().map(Document::to_json_string))
    }

    /// Migrates the contents of a backup file to the current version.
    ///
    /// Nothing is written; the host inserts the returned records.
    ///
    /// # Errors
    /// - `JsonError` for a malformed backup
    /// - `BackupVersionTooNew` for a backup written by a newer build
    /// - `DocumentTransformFailure` for the first record that cannot be migrated
    #[allow(clippy::needless_pass_by_value)] // uniffi hands over owned strings
    pub fn restore_backup(&self, json: String) -> Result<RestoredBackup, MigrationError> {
        BackupRestorer::new(&self.keymaps, &self.fingerprint_maps).restore(&json)
    }

    /// Delete all run records from the preference store.
    ///
    /// **Developer/testing use only.** Schema versions are not touched, so nothing re-runs;
    /// only the diagnostic history is cleared. Returns the number of records removed.
    ///
    /// # Errors
    /// - `InvalidOperation` if a run is in progress
    /// - `PreferenceStore` if the store fails
    pub fn delete_run_records(&self) -> Result<u32, MigrationError> {
        let _guard = try_lock_migrations()?;

        let mut deleted = 0;
        for family in [KEYMAP_FAMILY, FINGERPRINT_FAMILY] {
            let key = record_key(family);
            if self.preferences.read_value(key.clone())?.is_some() {
                self.preferences.remove_value(key)?;
                deleted += 1;
            }
        }

        crate::info!(
            "migration_records.deleted count={} timestamp={}",
            deleted,
            Utc::now().to_rfc3339()
        );

        Ok(deleted)
    }
}

fn record_key(family: &str) -> String {
    format!("{MIGRATION_KEY_PREFIX}{family}")
}

impl MigrationController {
    fn run_all(&self) -> MigrationResult<MigrationRunSummary> {
        let run_start_time = Utc::now();
        crate::info!(
            "migration_run.started families=2 timestamp={}",
            run_start_time.to_rfc3339()
        );

        let (keymaps, fingerprint_maps) = std::thread::scope(|scope| {
            let fingerprint_maps = scope.spawn(|| self.run_fingerprint_family());
            let keymaps = self.run_keymap_family();
            let fingerprint_maps = fingerprint_maps
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            (keymaps, fingerprint_maps)
        });

        let duration_ms = (Utc::now() - run_start_time).num_milliseconds();
        let (keymaps, fingerprint_maps_migrated) = match (keymaps, fingerprint_maps) {
            (Ok(keymaps), Ok(migrated)) => (keymaps, migrated),
            (Err(e), _) | (_, Err(e)) => {
                crate::error!(
                    "migration_run.failed error_code={} error_message={} duration_ms={} timestamp={}",
                    e.code(),
                    e,
                    duration_ms,
                    Utc::now().to_rfc3339()
                );
                return Err(e);
            }
        };

        let migrated = u32::from(!keymaps.steps.is_empty()) + u32::from(fingerprint_maps_migrated > 0);
        let summary = MigrationRunSummary {
            total: 2,
            migrated,
            up_to_date: 2 - migrated,
            keymaps,
            fingerprint_maps_migrated,
        };

        crate::info!(
            "migration_run.completed total={} migrated={} up_to_date={} keymap_version={} fingerprint_maps_migrated={} duration_ms={} timestamp={}",
            summary.total,
            summary.migrated,
            summary.up_to_date,
            summary.keymaps.to_version,
            summary.fingerprint_maps_migrated,
            duration_ms,
            Utc::now().to_rfc3339()
        );

        Ok(summary)
    }

    fn run_keymap_family(&self) -> MigrationResult<TableMigrationReport> {
        let from_version = self.database.schema_version()?;
        if from_version == KEYMAP_DATABASE_VERSION {
            crate::info!(
                "migration.skipped family={} reason=up_to_date version={} timestamp={}",
                KEYMAP_FAMILY,
                from_version,
                Utc::now().to_rfc3339()
            );
            return Ok(TableMigrationReport {
                family: KEYMAP_FAMILY.to_string(),
                from_version,
                to_version: from_version,
                steps: Vec::new(),
            });
        }

        self.tracked(KEYMAP_FAMILY, from_version, KEYMAP_DATABASE_VERSION, || {
            let report = TableMigrator::new(self.database.as_ref())
                .migrate_table(&self.keymap_table, KEYMAP_DATABASE_VERSION)?;
            let reached = report.to_version;
            Ok((report, reached))
        })
    }

    fn run_fingerprint_family(&self) -> MigrationResult<u32> {
        let mut pending = Vec::new();
        for (gesture, _) in LEGACY_GESTURES {
            if let Some(json) = self.preferences.read_value(gesture.to_string())? {
                let version = fingerprint::stored_version(&Document::parse(&json)?)?;
                if version != PREFERENCE_VERSION {
                    pending.push((gesture, version));
                }
            }
        }

        let Some(from_version) = pending.iter().map(|(_, version)| *version).min() else {
            crate::info!(
                "migration.skipped family={} reason=up_to_date timestamp={}",
                FINGERPRINT_FAMILY,
                Utc::now().to_rfc3339()
            );
            return Ok(0);
        };

        self.tracked(FINGERPRINT_FAMILY, from_version, PREFERENCE_VERSION, || {
            let mut migrated = 0;
            for (gesture, _) in &pending {
                if fingerprint::migrate_preference(
                    self.preferences.as_ref(),
                    &self.fingerprint_maps,
                    gesture,
                )?
                .is_some()
                {
                    migrated += 1;
                }
            }
            Ok((migrated, PREFERENCE_VERSION))
        })
    }

    /// Runs one family's migration, keeping its run record up to date.
    ///
    /// Record storage failures are logged and never fail the migration itself.
    fn tracked<T>(
        &self,
        family: &str,
        from_version: u32,
        target_version: u32,
        migrate: impl FnOnce() -> MigrationResult<(T, u32)>,
    ) -> MigrationResult<T> {
        let mut record = self.load_record(family);
        record.begin(from_version, target_version);

        crate::info!(
            "migration.started family={} from={} to={} attempt={} timestamp={}",
            family,
            from_version,
            target_version,
            record.attempts,
            Utc::now().to_rfc3339()
        );

        // saved before running so a crash mid-run leaves an InProgress record behind
        self.save_record(family, &record);

        let started = Utc::now();
        let outcome = migrate();
        let duration_ms = (Utc::now() - started).num_milliseconds();

        let result = match outcome {
            Ok((value, reached)) => {
                crate::info!(
                    "migration.succeeded family={} reached={} attempt={} duration_ms={} timestamp={}",
                    family,
                    reached,
                    record.attempts,
                    duration_ms,
                    Utc::now().to_rfc3339()
                );
                record.succeed(reached);
                Ok(value)
            }
            Err(e) => {
                crate::error!(
                    "migration.failed family={} attempt={} duration_ms={} error_code={} error_message={} timestamp={}",
                    family,
                    record.attempts,
                    duration_ms,
                    e.code(),
                    e,
                    Utc::now().to_rfc3339()
                );
                record.fail(&e);
                Err(e)
            }
        };

        self.save_record(family, &record);
        result
    }

    /// Loads a family's run record.
    ///
    /// # Corruption Handling
    ///
    /// A record that cannot be read or parsed is treated as a reset, so a damaged record
    /// never blocks a migration.
    fn load_record(&self, family: &str) -> MigrationRecord {
        match self.preferences.read_value(record_key(family)) {
            Ok(None) => MigrationRecord::new(),
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Migration record for {family} has corrupted JSON data, resetting: {e:?}");
                MigrationRecord::new()
            }),
            Err(e) => {
                warn!("Migration record for {family} could not be read, resetting: {e:?}");
                MigrationRecord::new()
            }
        }
    }

    fn save_record(&self, family: &str, record: &MigrationRecord) {
        let saved = serde_json::to_string(record)
            .map_err(MigrationError::from)
            .and_then(|json| {
                self.preferences
                    .write_value(record_key(family), json)
                    .map_err(MigrationError::from)
            });
        if let Err(e) = saved {
            crate::error!(
                "migration.storage_error family={} status={:?} error={:?} timestamp={}",
                family,
                record.status,
                e,
                Utc::now().to_rfc3339()
            );
        }
    }

    #[cfg(test)]
    fn record(&self, family: &str) -> Option<MigrationRecord> {
        self.preferences
            .read_value(record_key(family))
            .ok()
            .flatten()
            .and_then(|json| serde_json::from_str(&json).ok())
    }
}
