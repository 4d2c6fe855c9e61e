//! Repeating actions: 2 to 3 turns repeat on where it used to be implicit, 4 to 5 moves the
//! option and its delays from the key map onto each action.

use crate::document::{remove_extra, Document};
use crate::migration::step::{StepContext, TransformError};

use super::flags::{moved_bits, v2, without_moved, V4_TO_V5_ACTION};
use super::schema::columns;
use super::shape::{action, actions_mut, add_action_flags, extra, key, trigger, trigger_mut};

/// Trigger extras that configure repeating.
const REPEAT_EXTRAS: &[&str] = &[extra::REPEAT_DELAY, extra::HOLD_DOWN_UNTIL_REPEAT_DELAY];

fn is_repeatable(candidate: &Document) -> Result<bool, TransformError> {
    Ok(match candidate.str_field(action::TYPE)? {
        action::TYPE_KEY_EVENT | action::TYPE_TEXT_BLOCK => true,
        action::TYPE_SYSTEM_ACTION => candidate
            .opt_str_field(action::DATA)?
            .is_some_and(|id| action::REPEATABLE_SYSTEM_ACTIONS.contains(&id)),
        _ => false,
    })
}

/// Before version 3 a repeatable action repeated whenever the trigger was held. Makes that
/// explicit with the repeat flag, for triggers that can be held: only short and long presses,
/// and either a single key or keys pressed in parallel.
pub fn enable_repeat(mut row: Document, _context: &StepContext<'_>) -> Result<Document, TransformError> {
    let old_trigger = row.field(columns::TRIGGER)?;
    let keys = old_trigger.list_field(trigger::KEYS)?;
    let mode = old_trigger.int_field(trigger::MODE)?;

    let mut holdable = mode == trigger::MODE_PARALLEL || keys.len() == 1;
    for trigger_key in keys {
        let click_type = trigger_key.int_field(key::CLICK_TYPE)?;
        holdable &= click_type == key::CLICK_SHORT_PRESS || click_type == key::CLICK_LONG_PRESS;
    }

    let mut repeatable = false;
    for candidate in row.list_field(columns::ACTION_LIST)? {
        repeatable |= is_repeatable(candidate)?;
    }

    if holdable && repeatable {
        let flags = row.int_field(columns::FLAGS)?;
        row.set(columns::FLAGS, flags | v2::KEYMAP_REPEAT)?;
    }
    Ok(row)
}

/// Moves repeat and toast from the key map to every action, together with the repeat delays
/// configured on the trigger. Delays stay on the trigger when there is no action to carry
/// them.
pub fn move_repeat_to_actions(
    mut row: Document,
    _context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let flags = row.int_field(columns::FLAGS)?;
    let action_bits = moved_bits(flags, V4_TO_V5_ACTION);

    let repeat_extras: Vec<(String, Document)> = trigger_mut(&mut row)?
        .list_field(trigger::EXTRAS)?
        .iter()
        .filter_map(|option| {
            let id = option.get("id")?.as_str()?;
            REPEAT_EXTRAS
                .contains(&id)
                .then(|| (id.to_string(), option.clone()))
        })
        .collect();

    let actions = actions_mut(&mut row)?;
    let has_actions = !actions.is_empty();
    for target in actions.iter_mut() {
        add_action_flags(target, action_bits)?;
        if repeat_extras.is_empty() {
            continue;
        }
        let extras = target.list_field_mut(action::EXTRAS)?;
        for (id, option) in &repeat_extras {
            remove_extra(extras, id);
            extras.push(option.clone());
        }
    }

    if has_actions {
        let trigger_extras = trigger_mut(&mut row)?.list_field_mut(trigger::EXTRAS)?;
        for id in REPEAT_EXTRAS {
            remove_extra(trigger_extras, id);
        }
    }

    row.set(columns::FLAGS, without_moved(flags, V4_TO_V5_ACTION))?;
    Ok(row)
}
