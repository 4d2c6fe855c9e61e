//! Migration System
//!
//! Moves persisted records from whatever schema version they were written at to the version
//! this build understands.
//!
//! # Overview
//!
//! The migration system consists of:
//! - [`MigrationStep`]: one version hop, `version_before -> version_after`, and its transform
//! - [`MigrationRegistry`]: every step of a record family, validated once at construction
//! - [`MigrationChain`]: the contiguous run of steps from a stored version to a target
//! - [`executor`]: runs a chain over a single detached document
//! - [`TableMigrator`]: runs a chain over a whole table, one transaction per step
//! - [`MigrationController`]: the host-facing entry point tying the families together
//!
//! The schema version stored next to the data (`PRAGMA user_version` for the key map
//! database, `db_version` inside each fingerprint preference) is the only gate. Run records
//! stored under `migration:{family}` are diagnostic.
//!
//! # Usage
//!
//! ## Platform Usage (Kotlin)
//!
//! ```kotlin
//! // 1. Wrap Room's SupportSQLiteDatabase and the DataStore preferences
//! val database = RoomMigrationDatabase(supportDb)
//! val preferences = DataStorePreferenceStore(dataStore)
//!
//! // 2. Create the controller
//! val controller = MigrationController(database, preferences)
//!
//! // 3. Run migrations before Room opens the database
//! val summary = controller.runMigrations()
//!
//! // Restoring a backup returns records ready to insert
//! val restored = controller.restoreBackup(backupJson)
//! ```
//!
//! ## Adding a New Schema Version
//!
//! 1. Write the transform in the family's module (`families::keymap`), reading and writing the
//!    record through the named `Document` accessors.
//! 2. Append a `MigrationStep::new(13, 14, "name", transform)` to `document_steps()`.
//! 3. If the step needs DDL, give it a `TablePlan` in `table_plan()`.
//! 4. Bump `KEYMAP_DATABASE_VERSION`.
//!
//! Steps are never edited once released; a fix ships as a new step.
//!
//! # Failure and Resume
//!
//! Every table step commits together with its new schema version. A failing step rolls back,
//! leaving the database at the last committed version, and the next run resumes there.
//! Preference-backed records are written back only after the whole chain succeeded.

mod backup;
mod controller;
mod error;
mod state;

/// Step definitions and the context handed to transforms.
pub mod step;

/// Step registries and chain resolution.
pub mod registry;

/// The single-document path.
pub mod executor;

/// The bulk table path.
pub mod table;

/// Device name lookups shared by every record a step touches.
pub mod cross_reference;

// Public API exports
pub use backup::{BackupRestorer, RestoredBackup, UNVERSIONED_BACKUP_VERSION};
pub use controller::{MigrationController, MigrationRunSummary};
pub use error::{MigrationError, MigrationResult};
pub use registry::{MigrationChain, MigrationRegistry};
pub use state::{MigrationRecord, MigrationStatus};
pub use step::{MigrationStep, StepContext, VersionedStep};
pub use table::{TableMigrationReport, TableMigrator};
