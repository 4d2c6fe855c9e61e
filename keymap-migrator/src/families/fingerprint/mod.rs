use crate::document::Document;
use crate::migration::cross_reference::DeviceNameSnapshot;
use crate::migration::{MigrationError, MigrationResult};
use crate::migration::executor;
use crate::migration::registry::MigrationRegistry;
use crate::migration::step::{MigrationStep, StepContext};
use crate::primitives::preferences::PreferenceStore;

pub mod flags;
mod import;
mod steps;

pub use import::LegacyFingerprintImport;

/// Family name used in errors, logs and run records.
pub const FINGERPRINT_FAMILY: &str = "fingerprint-gesture-map";

/// Newest version of the preference-backed form.
pub const PREFERENCE_VERSION: u32 = 2;

/// Version at which maps live as `fingerprintmaps` rows.
pub const TABLE_VERSION: u32 = 12;

/// Newest version of the family.
pub const FINGERPRINT_VERSION: u32 = 13;

/// Row id of a map whose gesture is not known.
pub const UNKNOWN_GESTURE_ID: i64 = -1;

/// Preference keys of the four gestures and their row ids.
pub const LEGACY_GESTURES: [(&str, i64); 4] = [
    ("swipe_down", 0),
    ("swipe_up", 1),
    ("swipe_left", 2),
    ("swipe_right", 3),
];

/// Field names of a fingerprint map document.
pub mod fields {
    /// Row id, added by the 2 to 12 step
    pub const ID: &str = "id";
    /// Action list
    pub const ACTION_LIST: &str = "action_list";
    /// Constraint list, stored in the `constraint_list` column
    pub const CONSTRAINTS: &str = "constraints";
    /// And/or mode of the constraints
    pub const CONSTRAINT_MODE: &str = "constraint_mode";
    /// List of `{id, data}` options
    pub const EXTRAS: &str = "extras";
    /// Map flag bits
    pub const FLAGS: &str = "flags";
    /// Boolean, stored in the `is_enabled` column
    pub const ENABLED: &str = "enabled";
    /// Version of a preference-backed map; absent means 0
    pub const DB_VERSION: &str = "db_version";
}

/// Row id for a gesture preference key.
#[must_use]
pub fn gesture_id(key: &str) -> i64 {
    LEGACY_GESTURES
        .iter()
        .find(|(gesture, _)| *gesture == key)
        .map_or(UNKNOWN_GESTURE_ID, |(_, id)| *id)
}

/// Every fingerprint map step, oldest first.
#[must_use]
pub fn document_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new(0, 1, "move_repeat_to_actions", steps::move_repeat_to_actions),
        MigrationStep::new(1, 2, "move_toast_to_map", steps::move_toast_to_map),
        MigrationStep::new(2, 12, "prepare_table_row", steps::prepare_table_row),
        MigrationStep::unchanged(12, 13, "bump_12_13"),
    ]
}

/// Registry of the fingerprint map family.
///
/// # Errors
/// Only if the step list is inconsistent.
pub fn document_registry() -> MigrationResult<MigrationRegistry<MigrationStep>> {
    MigrationRegistry::new(FINGERPRINT_FAMILY, document_steps())
}

/// The version a preference-backed map was written at.
///
/// # Errors
/// - `InvalidDocument` if the map is not an object or `db_version` is not an integer
/// - `JsonError` if `db_version` is negative or too large
pub fn stored_version(map: &Document) -> MigrationResult<u32> {
    let version = map.opt_int_field(fields::DB_VERSION)?.unwrap_or(0);
    u32::try_from(version).map_err(|_| MigrationError::JsonError {
        message: format!("`{}` out of range: {version}", fields::DB_VERSION),
    })
}

/// Reads a gesture's preference and brings it to [`PREFERENCE_VERSION`], writing the result
/// back once if anything changed.
///
/// # Errors
/// - `PreferenceStore` if the store fails
/// - `JsonError` if the value is not a JSON document
/// - `InvalidDocument` if its `db_version` is not an integer
/// - `DowngradeUnsupported` if the value was written by a newer build
/// - `DocumentTransformFailure` if a step fails, in which case nothing is written
pub fn migrate_preference(
    store: &dyn PreferenceStore,
    registry: &MigrationRegistry<MigrationStep>,
    gesture: &str,
) -> MigrationResult<Option<Document>> {
    let Some(json) = store.read_value(gesture.to_string())? else {
        return Ok(None);
    };
    let map = Document::parse(&json)?;
    let version = stored_version(&map)?;
    if version == PREFERENCE_VERSION {
        return Ok(Some(map));
    }

    let snapshot = DeviceNameSnapshot::empty();
    let context = StepContext::detached(&snapshot).with_record_key(gesture);
    let mut migrated = executor::migrate(registry, version, PREFERENCE_VERSION, map, &context)?;
    migrated.set(fields::DB_VERSION, PREFERENCE_VERSION)?;
    store.write_value(gesture.to_string(), migrated.to_json_string())?;

    crate::info!(
        "fingerprint_map.migrated gesture={} from={} to={}",
        gesture,
        version,
        PREFERENCE_VERSION
    );
    Ok(Some(migrated))
}

/// Migrates one serialized fingerprint map. `gesture_id` is the preference key the map was
/// stored under (`swipe_down`, ...), which decides its row id from version 12 on.
///
/// # Errors
/// - `JsonError` if `json` is not a JSON document
/// - chain resolution and transform errors
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)] // uniffi hands over owned strings
pub fn migrate_fingerprint_map_json(
    gesture_id: String,
    initial_version: u32,
    target_version: u32,
    json: String,
) -> Result<String, MigrationError> {
    let registry = document_registry()?;
    let map = Document::parse(&json)?;
    let snapshot = DeviceNameSnapshot::empty();
    let context = StepContext::detached(&snapshot).with_record_key(&gesture_id);
    let mut migrated = executor::migrate(&registry, initial_version, target_version, map, &context)?;
    if target_version <= PREFERENCE_VERSION {
        migrated.set(fields::DB_VERSION, target_version)?;
    }
    Ok(migrated.to_json_string())
}
