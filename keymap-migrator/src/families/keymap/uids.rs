//! 6 to 7 gives every key map a uid, 8 to 9 gives every trigger key and action one.
//!
//! Uids introduced here are derived from the record's identity rather than random, so a step
//! that is retried after a rollback writes the same uids again.

use crate::document::Document;
use crate::families::derive_uid;
use crate::migration::step::{StepContext, TransformError};

use super::schema::columns;
use super::shape::{action, actions_mut, key, trigger, trigger_mut};

/// The storage id of a key map, from the context or, for detached documents, the `id` field.
fn keymap_id(row: &Document, context: &StepContext<'_>) -> Result<i64, TransformError> {
    match context.record_id {
        Some(id) => Ok(id),
        None => row.opt_int_field(columns::ID)?.ok_or_else(|| {
            TransformError::invalid(columns::ID, "key map has no id to derive a uid from")
        }),
    }
}

fn has_uid(document: &Document, field: &str) -> Result<bool, TransformError> {
    Ok(document
        .opt_str_field(field)?
        .is_some_and(|uid| !uid.is_empty()))
}

/// Sets the key map uid unless one is already present.
pub fn assign_keymap_uid(
    mut row: Document,
    context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    if !has_uid(&row, columns::UID)? {
        let id = keymap_id(&row, context)?;
        row.set(columns::UID, derive_uid(&format!("keymap:{id}")))?;
    }
    Ok(row)
}

/// Gives trigger keys a uid and empty flags, and actions a uid.
pub fn assign_key_and_action_uids(
    mut row: Document,
    context: &StepContext<'_>,
) -> Result<Document, TransformError> {
    let seed = match row.opt_str_field(columns::UID)? {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => format!("keymap:{}", keymap_id(&row, context)?),
    };

    for (index, trigger_key) in trigger_mut(&mut row)?
        .list_field_mut(trigger::KEYS)?
        .iter_mut()
        .enumerate()
    {
        if !has_uid(trigger_key, key::UID)? {
            trigger_key.set(key::UID, derive_uid(&format!("{seed}:key:{index}")))?;
        }
        if !trigger_key.contains(key::FLAGS) {
            trigger_key.set(key::FLAGS, 0)?;
        }
    }

    for (index, current) in actions_mut(&mut row)?.iter_mut().enumerate() {
        if !has_uid(current, action::UID)? {
            current.set(action::UID, derive_uid(&format!("{seed}:action:{index}")))?;
        }
    }

    Ok(row)
}
