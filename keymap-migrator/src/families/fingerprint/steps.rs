use crate::document::{remove_extra, Document};
use crate::families::keymap::flags::{moved_bits, without_moved};
use crate::families::keymap::name_action_devices;
use crate::families::keymap::shape::{action, add_action_flags, extra};
use crate::migration::step::{StepContext, TransformError};

use super::flags::{V0_TO_V1_ACTION, V1_TO_V2_MAP};
use super::{fields, gesture_id};

const REPEAT_EXTRAS: &[&str] = &[extra::REPEAT_DELAY, extra::HOLD_DOWN_UNTIL_REPEAT_DELAY];

/// The action list; maps saved before any action was configured have none.
fn actions_mut(map: &mut Document) -> Result<&mut Vec<Document>, TransformError> {
    if !map.contains(fields::ACTION_LIST) {
        map.set(fields::ACTION_LIST, Document::List(Vec::new()))?;
    }
    Ok(map.list_field_mut(fields::ACTION_LIST)?)
}

/// 0 to 1: repeat and its delays move from the map onto every action.
pub fn move_repeat_to_actions(
    mut map: Document,
    _context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let flags = map.opt_int_field(fields::FLAGS)?.unwrap_or(0);
    let action_bits = moved_bits(flags, V0_TO_V1_ACTION);

    let repeat_extras: Vec<(String, Document)> = map
        .get(fields::EXTRAS)
        .and_then(Document::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|option| {
            let id = option.get("id")?.as_str()?;
            REPEAT_EXTRAS
                .contains(&id)
                .then(|| (id.to_string(), option.clone()))
        })
        .collect();

    let actions = actions_mut(&mut map)?;
    let has_actions = !actions.is_empty();
    for target in actions.iter_mut() {
        add_action_flags(target, action_bits)?;
        let extras = target.list_field_mut(action::EXTRAS)?;
        for (id, option) in &repeat_extras {
            remove_extra(extras, id);
            extras.push(option.clone());
        }
    }

    if has_actions && !repeat_extras.is_empty() {
        let map_extras = map.list_field_mut(fields::EXTRAS)?;
        for id in REPEAT_EXTRAS {
            remove_extra(map_extras, id);
        }
    }

    if map.contains(fields::FLAGS) {
        map.set(fields::FLAGS, without_moved(flags, V0_TO_V1_ACTION))?;
    }
    Ok(map)
}

/// 1 to 2: a toast on any action becomes a toast for the whole map.
pub fn move_toast_to_map(
    mut map: Document,
    _context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let mut map_bits = 0;
    for current in actions_mut(&mut map)? {
        if let Some(flags) = current.opt_int_field(action::FLAGS)? {
            map_bits |= moved_bits(flags, V1_TO_V2_MAP);
            current.set(action::FLAGS, without_moved(flags, V1_TO_V2_MAP))?;
        }
    }

    if map_bits != 0 {
        let flags = map.opt_int_field(fields::FLAGS)?.unwrap_or(0);
        map.set(fields::FLAGS, flags | map_bits)?;
    }
    Ok(map)
}

/// 2 to 12: prepares a preference-backed map for its row in `fingerprintmaps`.
pub fn prepare_table_row(
    mut map: Document,
    context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    name_action_devices(actions_mut(&mut map)?, context.device_names)?;
    map.set(fields::ID, context.record_key.map_or(super::UNKNOWN_GESTURE_ID, gesture_id))?;
    map.remove(fields::DB_VERSION)?;
    Ok(map)
}
