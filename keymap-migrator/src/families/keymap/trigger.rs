//! Steps that reshape the trigger: 3 to 4, 5 to 6 and 9 to 10.

use crate::document::Document;
use crate::migration::step::{StepContext, TransformError};

use super::flags::{moved_bits, without_moved, V5_TO_V6_TRIGGER, V9_TO_V10_TRIGGER};
use super::schema::columns;
use super::shape::{action, actions_mut, trigger, trigger_mut};

/// Triggers with zero or one key get the undefined mode.
pub fn mark_undefined_mode(
    mut row: Document,
    _context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let current = trigger_mut(&mut row)?;
    if current.list_field(trigger::KEYS)?.len() <= 1 {
        current.set(trigger::MODE, trigger::MODE_UNDEFINED)?;
    }
    Ok(row)
}

/// Moves vibration and screen-off options from the key map flags into trigger flags.
pub fn move_options_to_trigger(
    mut row: Document,
    _context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let flags = row.int_field(columns::FLAGS)?;

    let current = trigger_mut(&mut row)?;
    let trigger_flags = current.opt_int_field(trigger::FLAGS)?.unwrap_or(0);
    current.set(
        trigger::FLAGS,
        trigger_flags | moved_bits(flags, V5_TO_V6_TRIGGER),
    )?;

    row.set(columns::FLAGS, without_moved(flags, V5_TO_V6_TRIGGER))?;
    Ok(row)
}

/// Folds the per-action toast into one trigger flag.
pub fn move_toast_to_trigger(
    mut row: Document,
    _context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let mut trigger_bits = 0;
    for current in actions_mut(&mut row)? {
        let flags = current.opt_int_field(action::FLAGS)?.unwrap_or(0);
        trigger_bits |= moved_bits(flags, V9_TO_V10_TRIGGER);
        current.set(action::FLAGS, without_moved(flags, V9_TO_V10_TRIGGER))?;
    }

    if trigger_bits != 0 {
        let current = trigger_mut(&mut row)?;
        let flags = current.opt_int_field(trigger::FLAGS)?.unwrap_or(0);
        current.set(trigger::FLAGS, flags | trigger_bits)?;
    }
    Ok(row)
}
