//! Field names and enumerations inside the serialized trigger and action documents.

use crate::document::Document;
use crate::migration::step::TransformError;

use super::schema::columns;

/// Trigger fields.
pub mod trigger {
    /// List of trigger keys
    pub const KEYS: &str = "keys";
    /// List of `{id, data}` options
    pub const EXTRAS: &str = "extras";
    /// Parallel, sequence or undefined
    pub const MODE: &str = "mode";
    /// Trigger flag bits, added by the 5 to 6 step
    pub const FLAGS: &str = "flags";

    /// All keys must be pressed at once
    pub const MODE_PARALLEL: i64 = 0;
    /// Keys must be pressed one after another
    pub const MODE_SEQUENCE: i64 = 1;
    /// Zero or one key, so neither parallel nor sequence applies
    pub const MODE_UNDEFINED: i64 = 2;
}

/// Trigger key fields.
pub mod key {
    /// Android key code
    pub const KEY_CODE: &str = "keyCode";
    /// Input device descriptor or one of the special device ids
    pub const DEVICE_ID: &str = "deviceId";
    /// Short, long or double press
    pub const CLICK_TYPE: &str = "clickType";
    /// Display name of the device, added by the 11 to 12 step
    pub const DEVICE_NAME: &str = "deviceName";
    /// Key uid, added by the 8 to 9 step
    pub const UID: &str = "uid";
    /// Key flag bits, added by the 8 to 9 step
    pub const FLAGS: &str = "flags";

    /// The key must come from the device the app runs on
    pub const DEVICE_ID_THIS_DEVICE: &str = "io.github.sds100.keymapper.THIS_DEVICE";
    /// The key may come from any device
    pub const DEVICE_ID_ANY_DEVICE: &str = "io.github.sds100.keymapper.ANY_DEVICE";

    /// Short press
    pub const CLICK_SHORT_PRESS: i64 = 0;
    /// Long press
    pub const CLICK_LONG_PRESS: i64 = 1;
}

/// Action fields.
pub mod action {
    /// Action type name
    pub const TYPE: &str = "type";
    /// Type specific payload
    pub const DATA: &str = "data";
    /// List of `{id, data}` options
    pub const EXTRAS: &str = "extras";
    /// Action flag bits
    pub const FLAGS: &str = "flags";
    /// Action uid, added by the 8 to 9 step
    pub const UID: &str = "uid";

    /// Sends a key event
    pub const TYPE_KEY_EVENT: &str = "KEY_EVENT";
    /// Types a block of text
    pub const TYPE_TEXT_BLOCK: &str = "TEXT_BLOCK";
    /// Runs a system action named by `data`
    pub const TYPE_SYSTEM_ACTION: &str = "SYSTEM_ACTION";

    /// System actions that make sense to repeat while the trigger is held.
    pub const REPEATABLE_SYSTEM_ACTIONS: &[&str] = &[
        "volume_up",
        "volume_down",
        "volume_increase_stream",
        "volume_decrease_stream",
        "increase_brightness",
        "decrease_brightness",
    ];
}

/// Extra ids.
pub mod extra {
    /// Delay between repeats
    pub const REPEAT_DELAY: &str = "extra_repeat_delay";
    /// Delay before the first repeat
    pub const HOLD_DOWN_UNTIL_REPEAT_DELAY: &str = "extra_hold_down_until_repeat_delay";
    /// Descriptor of the device a key event action is sent from
    pub const DEVICE_DESCRIPTOR: &str = "extra_device_descriptor";
    /// Name of that device, added by the 11 to 12 step
    pub const DEVICE_NAME: &str = "extra_device_name";
}

/// The trigger map of a key map row.
///
/// # Errors
/// If the row has no trigger map.
pub fn trigger_mut(keymap: &mut Document) -> Result<&mut Document, TransformError> {
    Ok(keymap.map_field_mut(columns::TRIGGER)?)
}

/// The action list of a key map row.
///
/// # Errors
/// If the row has no action list.
pub fn actions_mut(keymap: &mut Document) -> Result<&mut Vec<Document>, TransformError> {
    Ok(keymap.list_field_mut(columns::ACTION_LIST)?)
}

/// Adds `bits` to an action's flags; an action without flags starts from 0.
///
/// # Errors
/// If the action is not a map or its flags are not an integer.
pub fn add_action_flags(action: &mut Document, bits: i64) -> Result<(), TransformError> {
    let flags = action.opt_int_field(action::FLAGS)?.unwrap_or(0);
    action.set(action::FLAGS, flags | bits)?;
    Ok(())
}
