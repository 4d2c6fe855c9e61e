use std::sync::Arc;

use crate::document::Document;
use crate::migration::cross_reference::DeviceNameSnapshot;
use crate::migration::{MigrationError, MigrationResult};
use crate::migration::executor;
use crate::migration::registry::MigrationRegistry;
use crate::migration::step::{MigrationStep, StepContext, VersionedStep};
use crate::migration::table::{RowImport, TablePlan, TableStep};

mod device_names;
mod legacy;
mod repeat;
mod trigger;
mod uids;

pub mod flags;
pub mod schema;
pub mod shape;

pub use device_names::name_action_devices;

use schema::{
    ADD_UID_COLUMN, CREATE_FINGERPRINT_MAPS, CREATE_LOG, CREATE_NEW_KEYMAPS, DEVICE_INFO_TABLE,
    DROP_DEVICE_INFO, JSON_COLUMNS, KEYMAPS_TABLE, NEW_KEYMAPS_TABLE, REPLACE_KEYMAPS,
    V1_JSON_COLUMNS,
};

/// Family name used in errors, logs and run records.
pub const KEYMAP_FAMILY: &str = "keymap";

/// Schema version of the key map database this build writes.
pub const KEYMAP_DATABASE_VERSION: u32 = 13;

/// Every key map step, oldest first.
#[must_use]
pub fn document_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::expanding(1, 2, "split_trigger_list", legacy::split_trigger_list),
        MigrationStep::new(2, 3, "enable_repeat", repeat::enable_repeat),
        MigrationStep::new(3, 4, "mark_undefined_mode", trigger::mark_undefined_mode),
        MigrationStep::new(4, 5, "move_repeat_to_actions", repeat::move_repeat_to_actions),
        MigrationStep::new(5, 6, "move_options_to_trigger", trigger::move_options_to_trigger),
        MigrationStep::new(6, 7, "assign_keymap_uid", uids::assign_keymap_uid),
        MigrationStep::unchanged(7, 8, "bump_7_8"),
        MigrationStep::new(8, 9, "assign_key_and_action_uids", uids::assign_key_and_action_uids),
        MigrationStep::new(9, 10, "move_toast_to_trigger", trigger::move_toast_to_trigger),
        MigrationStep::unchanged(10, 11, "bump_10_11"),
        MigrationStep::new(11, 12, "name_devices", device_names::name_devices),
        MigrationStep::unchanged(12, 13, "create_log_table"),
    ]
}

/// Registry for single key map documents (backups, host JSON).
///
/// # Errors
/// Only if the step list above is inconsistent.
pub fn document_registry() -> MigrationResult<MigrationRegistry<MigrationStep>> {
    MigrationRegistry::new(KEYMAP_FAMILY, document_steps())
}

fn table_plan(version_before: u32, legacy_fingerprint_maps: &Arc<dyn RowImport>) -> TablePlan {
    let in_place = TablePlan::in_place(KEYMAPS_TABLE, JSON_COLUMNS);
    match version_before {
        1 => TablePlan::copying(KEYMAPS_TABLE, V1_JSON_COLUMNS, NEW_KEYMAPS_TABLE, JSON_COLUMNS)
            .with_before(CREATE_NEW_KEYMAPS)
            .with_after(REPLACE_KEYMAPS),
        6 => in_place.with_before(ADD_UID_COLUMN),
        11 => in_place
            .with_before(CREATE_FINGERPRINT_MAPS)
            .with_device_names_from(DEVICE_INFO_TABLE)
            .with_after(DROP_DEVICE_INFO)
            .with_import(Arc::clone(legacy_fingerprint_maps)),
        12 => in_place.with_before(CREATE_LOG),
        _ => in_place,
    }
}

/// Registry for the `keymaps` table. `legacy_fingerprint_maps` supplies the rows the 11 to 12
/// step moves from preferences into `fingerprintmaps`.
///
/// # Errors
/// Only if the step list is inconsistent.
pub fn table_registry(
    legacy_fingerprint_maps: &Arc<dyn RowImport>,
) -> MigrationResult<MigrationRegistry<TableStep>> {
    let steps = document_steps()
        .into_iter()
        .map(|step| {
            let plan = table_plan(step.version_before(), legacy_fingerprint_maps);
            TableStep::new(step, plan)
        })
        .collect();
    MigrationRegistry::new(KEYMAP_FAMILY, steps)
}

/// Migrates one serialized key map row from `initial_version` to `target_version`.
///
/// The document uses column names (`trigger`, `action_list`, ...). Steps that need a storage id
/// read the `id` field, and device names are unknown on this path.
///
/// # Errors
/// - `JsonError` if `json` is not a JSON document
/// - chain resolution and transform errors
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)] // uniffi hands over owned strings
pub fn migrate_keymap_json(
    initial_version: u32,
    target_version: u32,
    json: String,
) -> Result<String, MigrationError> {
    let registry = document_registry()?;
    let document = Document::parse(&json)?;
    let snapshot = DeviceNameSnapshot::empty();
    let migrated = executor::migrate(
        &registry,
        initial_version,
        target_version,
        document,
        &StepContext::detached(&snapshot),
    )?;
    Ok(migrated.to_json_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::derive_uid;
    use crate::primitives::database::TableRow;
    use schema::columns;

    struct NoRows;

    impl RowImport for NoRows {
        fn destination(&self) -> &str {
            schema::FINGERPRINT_MAPS_TABLE
        }

        fn rows(&self, _context: &StepContext<'_>) -> MigrationResult<Vec<TableRow>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_registry_reaches_current_version() {
        let registry = document_registry().unwrap();
        assert_eq!(registry.latest_version(), Some(KEYMAP_DATABASE_VERSION));
        assert_eq!(registry.resolve(1, KEYMAP_DATABASE_VERSION).unwrap().len(), 12);
    }

    #[test]
    fn test_table_plans() {
        let import: Arc<dyn RowImport> = Arc::new(NoRows);
        let registry = table_registry(&import).unwrap();
        let steps: Vec<_> = registry.steps().collect();

        assert_eq!(steps[0].plan().source(), KEYMAPS_TABLE);
        assert_eq!(steps[0].plan().destination(), NEW_KEYMAPS_TABLE);
        assert!(steps[1..]
            .iter()
            .all(|step| step.plan().destination() == KEYMAPS_TABLE));
        assert_eq!(steps[10].version_before(), 11);
    }

    #[test]
    fn test_full_chain_from_version_1() {
        let v1 = r#"{"id":1,"trigger_list":[{"keys":[25]}],"flags":5,"is_enabled":1,"action_type":"KEYCODE","action_data":"24","action_extras":"[]"}"#;

        let migrated =
            Document::parse(&migrate_keymap_json(1, 13, v1.to_string()).unwrap()).unwrap();

        let uid = derive_uid("keymap:1");
        assert_eq!(migrated.str_field(columns::UID).unwrap(), uid);
        assert_eq!(migrated.int_field(columns::FLAGS).unwrap(), 0);

        let trigger = migrated.field(columns::TRIGGER).unwrap();
        assert_eq!(trigger.int_field(shape::trigger::MODE).unwrap(), shape::trigger::MODE_UNDEFINED);
        // vibrate reached the trigger in 5 to 6, repeat the action in 4 to 5
        assert_eq!(trigger.int_field(shape::trigger::FLAGS).unwrap(), 1);
        let keys = trigger.list_field(shape::trigger::KEYS).unwrap();
        assert_eq!(keys[0].int_field(shape::key::CLICK_TYPE).unwrap(), shape::key::CLICK_LONG_PRESS);
        assert_eq!(keys[0].str_field(shape::key::UID).unwrap(), derive_uid(&format!("{uid}:key:0")));
        assert!(!keys[0].contains(shape::key::DEVICE_NAME));

        let actions = migrated.list_field(columns::ACTION_LIST).unwrap();
        assert_eq!(
            actions[0].to_json_string(),
            format!(
                r#"{{"data":"24","extras":[{{"data":"","id":"extra_device_name"}}],"flags":4,"type":"KEY_EVENT","uid":"{}"}}"#,
                derive_uid(&format!("{uid}:action:0"))
            )
        );
    }

    #[test]
    fn test_json_entry_point_errors() {
        assert!(matches!(
            migrate_keymap_json(13, 12, "{}".to_string()),
            Err(MigrationError::DowngradeUnsupported { stored: 13, target: 12, .. })
        ));
        assert!(matches!(
            migrate_keymap_json(2, 13, "not json".to_string()),
            Err(MigrationError::JsonError { .. })
        ));
        assert!(matches!(
            migrate_keymap_json(2, 3, r#"{"trigger":{"keys":[],"mode":1}}"#.to_string()),
            Err(MigrationError::DocumentTransformFailure { version_before: 2, .. })
        ));
        assert_eq!(migrate_keymap_json(13, 13, "{}".to_string()).unwrap(), "{}");
    }
}
