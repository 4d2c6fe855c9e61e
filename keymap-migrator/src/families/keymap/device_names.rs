//! 11 to 12: the `deviceinfo` table is dropped, so device names are copied into the records
//! that reference a device.

use crate::document::{extra_data, set_extra, Document};
use crate::migration::cross_reference::DeviceNameSnapshot;
use crate::migration::step::{StepContext, TransformError};

use super::shape::{action, actions_mut, extra, key, trigger, trigger_mut};

/// Adds the device name extra to every key event action. Unknown devices get an empty name.
///
/// # Errors
/// If an action has no type or no extras list.
pub fn name_action_devices(
    actions: &mut [Document],
    names: &DeviceNameSnapshot,
) -> Result<(), TransformError> {
    for current in actions {
        if current.str_field(action::TYPE)? != action::TYPE_KEY_EVENT {
            continue;
        }
        let extras = current.list_field_mut(action::EXTRAS)?;
        let name = extra_data(extras, extra::DEVICE_DESCRIPTOR)
            .map_or("", |descriptor| names.name_for(descriptor))
            .to_string();
        set_extra(extras, extra::DEVICE_NAME, &name);
    }
    Ok(())
}

/// Adds `deviceName` to trigger keys bound to a specific device. Keys bound to this device or
/// any device are left as they are.
fn name_key_devices(keys: &mut [Document], names: &DeviceNameSnapshot) -> Result<(), TransformError> {
    for trigger_key in keys {
        let device_id = trigger_key.str_field(key::DEVICE_ID)?;
        if device_id == key::DEVICE_ID_THIS_DEVICE || device_id == key::DEVICE_ID_ANY_DEVICE {
            continue;
        }
        let name = names.name_for(device_id).to_string();
        trigger_key.set(key::DEVICE_NAME, name)?;
    }
    Ok(())
}

/// Copies device names into a key map's trigger keys and key event actions.
pub fn name_devices(mut row: Document, context: &StepContext<'_>) -> Result<Document, TransformError> {
    name_key_devices(
        trigger_mut(&mut row)?.list_field_mut(trigger::KEYS)?,
        context.device_names,
    )?;
    name_action_devices(actions_mut(&mut row)?, context.device_names)?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::keymap::schema::columns;

    fn names() -> DeviceNameSnapshot {
        DeviceNameSnapshot::from_pairs([
            ("bluetooth_keyboard", "Keychron K2"),
            ("gamepad", "Xbox Wireless Controller"),
        ])
    }

    #[test]
    fn test_key_map_devices_are_named() {
        let names = names();
        let context = StepContext::detached(&names);
        let row = Document::parse(
            r#"{"trigger":{"extras":[],"flags":0,"keys":[{"clickType":0,"deviceId":"gamepad","flags":0,"keyCode":96,"uid":"a"},{"clickType":0,"deviceId":"io.github.sds100.keymapper.THIS_DEVICE","flags":0,"keyCode":25,"uid":"b"},{"clickType":0,"deviceId":"unplugged","flags":0,"keyCode":24,"uid":"c"}],"mode":0},"action_list":[{"data":"24","extras":[{"data":"bluetooth_keyboard","id":"extra_device_descriptor"}],"flags":0,"type":"KEY_EVENT","uid":"d"},{"data":"25","extras":[],"flags":0,"type":"KEY_EVENT","uid":"e"},{"data":"com.android.chrome","extras":[],"flags":0,"type":"APP","uid":"f"}]}"#,
        )
        .unwrap();

        let migrated = name_devices(row, &context).unwrap();

        assert_eq!(
            migrated.get(columns::TRIGGER).unwrap().to_json_string(),
            r#"{"extras":[],"flags":0,"keys":[{"clickType":0,"deviceId":"gamepad","deviceName":"Xbox Wireless Controller","flags":0,"keyCode":96,"uid":"a"},{"clickType":0,"deviceId":"io.github.sds100.keymapper.THIS_DEVICE","flags":0,"keyCode":25,"uid":"b"},{"clickType":0,"deviceId":"unplugged","deviceName":"","flags":0,"keyCode":24,"uid":"c"}],"mode":0}"#
        );
        assert_eq!(
            migrated.get(columns::ACTION_LIST).unwrap().to_json_string(),
            r#"[{"data":"24","extras":[{"data":"bluetooth_keyboard","id":"extra_device_descriptor"},{"data":"Keychron K2","id":"extra_device_name"}],"flags":0,"type":"KEY_EVENT","uid":"d"},{"data":"25","extras":[{"data":"","id":"extra_device_name"}],"flags":0,"type":"KEY_EVENT","uid":"e"},{"data":"com.android.chrome","extras":[],"flags":0,"type":"APP","uid":"f"}]"#
        );
    }

    #[test]
    fn test_naming_twice_is_stable() {
        let names = names();
        let context = StepContext::detached(&names);
        let row = Document::parse(
            r#"{"trigger":{"extras":[],"keys":[],"mode":2},"action_list":[{"data":"24","extras":[],"flags":0,"type":"KEY_EVENT"}]}"#,
        )
        .unwrap();

        let once = name_devices(row, &context).unwrap();
        let twice = name_devices(once.clone(), &context).unwrap();
        assert_eq!(once, twice);
    }
}
