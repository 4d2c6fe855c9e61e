//! Tables, columns and DDL of the key map database.

/// Key map table.
pub const KEYMAPS_TABLE: &str = "keymaps";
/// Staging table of the 1 to 2 rebuild.
pub const NEW_KEYMAPS_TABLE: &str = "new_keymaps";
/// `(descriptor, name)` lookup, versions 2 to 11.
pub const DEVICE_INFO_TABLE: &str = "deviceinfo";
/// Fingerprint gesture maps, version 12 and later.
pub const FINGERPRINT_MAPS_TABLE: &str = "fingerprintmaps";

/// Column names of `keymaps`.
pub mod columns {
    /// Primary key
    pub const ID: &str = "id";
    /// Trigger document
    pub const TRIGGER: &str = "trigger";
    /// Action list document
    pub const ACTION_LIST: &str = "action_list";
    /// Constraint list document
    pub const CONSTRAINT_LIST: &str = "constraint_list";
    /// And/or mode of the constraints
    pub const CONSTRAINT_MODE: &str = "constraint_mode";
    /// Key map flag bits
    pub const FLAGS: &str = "flags";
    /// Folder, unused
    pub const FOLDER_NAME: &str = "folder_name";
    /// 0 or 1
    pub const IS_ENABLED: &str = "is_enabled";
    /// Key map uid, version 7 and later
    pub const UID: &str = "uid";

    /// Version 1: list of `{"keys": [keyCode, ..]}`
    pub const TRIGGER_LIST: &str = "trigger_list";
    /// Version 1: action type, raw or JSON quoted
    pub const ACTION_TYPE: &str = "action_type";
    /// Version 1: action payload
    pub const ACTION_DATA: &str = "action_data";
    /// Version 1: action extras document
    pub const ACTION_EXTRAS: &str = "action_extras";
}

/// Column names of `fingerprintmaps`.
pub mod fingerprint_columns {
    /// Gesture id, 0 to 3
    pub const ID: &str = "id";
    /// Action list document
    pub const ACTION_LIST: &str = "action_list";
    /// Constraint list document
    pub const CONSTRAINT_LIST: &str = "constraint_list";
    /// And/or mode of the constraints
    pub const CONSTRAINT_MODE: &str = "constraint_mode";
    /// Extras document
    pub const EXTRAS: &str = "extras";
    /// Flag bits
    pub const FLAGS: &str = "flags";
    /// 0 or 1
    pub const IS_ENABLED: &str = "is_enabled";
}

/// JSON columns of the version 1 table.
pub const V1_JSON_COLUMNS: &[&str] = &[columns::TRIGGER_LIST];

/// JSON columns of the table from version 2 on.
pub const JSON_COLUMNS: &[&str] = &[columns::TRIGGER, columns::ACTION_LIST, columns::CONSTRAINT_LIST];

/// JSON columns of `fingerprintmaps`.
pub const FINGERPRINT_JSON_COLUMNS: &[&str] = &[
    fingerprint_columns::ACTION_LIST,
    fingerprint_columns::CONSTRAINT_LIST,
    fingerprint_columns::EXTRAS,
];

/// 1 to 2, before.
pub const CREATE_NEW_KEYMAPS: &[&str] = &["CREATE TABLE IF NOT EXISTS `new_keymaps` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `trigger` TEXT NOT NULL, `action_list` TEXT NOT NULL, `constraint_list` TEXT NOT NULL, `constraint_mode` INTEGER NOT NULL, `flags` INTEGER NOT NULL, `folder_name` TEXT, `is_enabled` INTEGER NOT NULL)"];

/// 1 to 2, after.
pub const REPLACE_KEYMAPS: &[&str] = &[
    "DROP TABLE keymaps",
    "ALTER TABLE new_keymaps RENAME TO keymaps",
    "CREATE TABLE IF NOT EXISTS `deviceinfo` (`descriptor` TEXT NOT NULL, `name` TEXT NOT NULL, PRIMARY KEY(`descriptor`))",
];

/// 6 to 7, before.
pub const ADD_UID_COLUMN: &[&str] = &["ALTER TABLE `keymaps` ADD COLUMN `uid` TEXT NOT NULL DEFAULT ''"];

/// 11 to 12, before.
pub const CREATE_FINGERPRINT_MAPS: &[&str] = &["CREATE TABLE IF NOT EXISTS `fingerprintmaps` (`id` INTEGER NOT NULL, `action_list` TEXT NOT NULL, `constraint_list` TEXT NOT NULL, `constraint_mode` INTEGER NOT NULL, `extras` TEXT NOT NULL, `flags` INTEGER NOT NULL, `is_enabled` INTEGER NOT NULL, PRIMARY KEY(`id`))"];

/// 11 to 12, after.
pub const DROP_DEVICE_INFO: &[&str] = &["DROP TABLE deviceinfo"];

/// 12 to 13, before.
pub const CREATE_LOG: &[&str] = &["CREATE TABLE IF NOT EXISTS `log` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `time` INTEGER NOT NULL, `severity` INTEGER NOT NULL, `message` TEXT NOT NULL)"];
