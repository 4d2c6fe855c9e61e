use std::sync::Arc;

mod common;
use common::{MemoryPreferences, SqliteDatabase, VERSION_11_SCHEMA};

use keymap_migrator::document::Document;
use keymap_migrator::migration::{MigrationController, MigrationError};

const VERSION_10_BACKUP: &str = r#"{
    "keymap_db_version": 10,
    "keymap_list": [
        {
            "id": 12,
            "uid": "5d1f2d6e-backup",
            "trigger": {"extras": [], "flags": 16, "keys": [{"clickType": 0, "deviceId": "gamepad", "flags": 0, "keyCode": 96, "uid": "k0"}], "mode": 2},
            "actionList": [{"data": "85", "extras": [{"id": "extra_device_descriptor", "data": "gamepad"}], "flags": 4, "type": "KEY_EVENT", "uid": "a0"}],
            "constraintList": [],
            "constraintMode": 1,
            "flags": 0,
            "folderName": null,
            "isEnabled": true
        }
    ],
    "device_info": [{"descriptor": "gamepad", "name": "8BitDo Pro 2"}],
    "fingerprint_swipe_down": {"action_list": [], "flags": 1, "db_version": 1},
    "fingerprint_swipe_up": {"action_list": [], "extras": [{"id": "extra_repeat_delay", "data": "100"}], "flags": 2}
}"#;

fn controller() -> anyhow::Result<Arc<MigrationController>> {
    let db = Arc::new(SqliteDatabase::open(13, VERSION_11_SCHEMA)?);
    Ok(MigrationController::new(db, Arc::new(MemoryPreferences::default()))?)
}

#[test]
fn test_version_10_backup_is_restored() -> anyhow::Result<()> {
    let restored = controller()?.restore_backup(VERSION_10_BACKUP.to_string())?;
    assert_eq!(restored.backup_version, 10);

    // 1) Key maps keep their backup field names but lose their identity
    assert_eq!(restored.keymaps.len(), 1);
    let keymap = Document::parse(&restored.keymaps[0])?;
    assert!(!keymap.contains("id"));
    assert_ne!(keymap.str_field("uid")?, "5d1f2d6e-backup");
    assert_eq!(keymap.int_field("constraintMode")?, 1);

    // 2) Device names come from the backup's own device list
    let key = &keymap.field("trigger")?.list_field("keys")?[0];
    assert_eq!(key.str_field("deviceName")?, "8BitDo Pro 2");
    let action = &keymap.list_field("actionList")?[0];
    assert_eq!(
        action.to_json_string(),
        r#"{"data":"85","extras":[{"data":"gamepad","id":"extra_device_descriptor"},{"data":"8BitDo Pro 2","id":"extra_device_name"}],"flags":4,"type":"KEY_EVENT","uid":"a0"}"#
    );

    // 3) Legacy fingerprint maps each migrate from their own version
    assert_eq!(restored.fingerprint_maps.len(), 2);
    let swipe_down = Document::parse(&restored.fingerprint_maps[0])?;
    assert_eq!(swipe_down.int_field("id")?, 0);
    assert_eq!(swipe_down.int_field("flags")?, 1);
    let swipe_up = Document::parse(&restored.fingerprint_maps[1])?;
    assert_eq!(swipe_up.int_field("id")?, 1);
    assert_eq!(swipe_up.int_field("flags")?, 0);
    assert_eq!(
        swipe_up.get("extras").unwrap().to_json_string(),
        r#"[{"data":"100","id":"extra_repeat_delay"}]"#
    );

    Ok(())
}

#[test]
fn test_backup_from_newer_build_is_refused() -> anyhow::Result<()> {
    let err = controller()?
        .restore_backup(r#"{"keymap_db_version":20,"keymap_list":[]}"#.to_string())
        .unwrap_err();
    assert!(matches!(
        err,
        MigrationError::BackupVersionTooNew {
            backup_version: 20,
            supported: 13
        }
    ));
    Ok(())
}
