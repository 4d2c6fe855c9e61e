//! 1 to 2: the version 1 table stored a list of triggers and a single action per row. Every
//! trigger becomes its own key map sharing that action.

use crate::document::Document;
use crate::migration::step::{StepContext, TransformError};

use super::flags::{has_flag, moved_bits, v1, V1_TO_V2_ACTION, V1_TO_V2_KEYMAP};
use super::schema::columns;
use super::shape::{action, key, trigger};

/// Constraint mode written for every migrated key map.
const CONSTRAINT_MODE_OR: i64 = 1;

/// Reads a version 1 `action_type`, which is either raw (`APP`) or JSON quoted (`"APP"`).
/// Missing, blank and the literal `NULL` mean the row has no action.
fn action_type(raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty() && *s != "NULL")?;
    let name = match Document::parse(raw) {
        Ok(Document::String(name)) => name,
        _ => raw.to_string(),
    };

    Some(match name.as_str() {
        "KEY" | "KEYCODE" => action::TYPE_KEY_EVENT.to_string(),
        _ => name,
    })
}

fn action_extras(raw: Option<&str>) -> Result<Vec<Document>, TransformError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty() && *s != "NULL") else {
        return Ok(Vec::new());
    };
    match Document::parse(raw) {
        Ok(Document::List(extras)) => Ok(extras),
        Ok(other) => Err(TransformError::invalid(
            columns::ACTION_EXTRAS,
            format!("expected a list, found {}", other.kind()),
        )),
        Err(e) => Err(TransformError::invalid(columns::ACTION_EXTRAS, e.to_string())),
    }
}

fn trigger_keys(old_trigger: &Document, click_type: i64) -> Result<Vec<Document>, TransformError> {
    old_trigger
        .list_field(trigger::KEYS)?
        .iter()
        .map(|code| {
            let key_code = code.as_i64().ok_or_else(|| {
                TransformError::invalid(trigger::KEYS, format!("key code is a {}", code.kind()))
            })?;
            Ok(Document::from_pairs([
                (key::KEY_CODE, Document::Int(key_code)),
                (key::DEVICE_ID, key::DEVICE_ID_ANY_DEVICE.into()),
                (key::CLICK_TYPE, Document::Int(click_type)),
            ]))
        })
        .collect()
}

fn new_trigger(keys: Vec<Document>) -> Document {
    let mode = if keys.len() <= 1 {
        trigger::MODE_SEQUENCE
    } else {
        trigger::MODE_PARALLEL
    };
    Document::from_pairs([
        (trigger::KEYS, Document::List(keys)),
        (trigger::EXTRAS, Document::List(Vec::new())),
        (trigger::MODE, Document::Int(mode)),
    ])
}

/// Splits a version 1 row into one version 2 key map per trigger.
pub fn split_trigger_list(
    row: Document,
    _context: &StepContext<'_>,
) -> Result<Vec<Document>, TransformError> {
    let flags = row.opt_int_field(columns::FLAGS)?.unwrap_or(0);
    let is_enabled = row.opt_int_field(columns::IS_ENABLED)?.unwrap_or(1);

    let action_list = match action_type(row.opt_str_field(columns::ACTION_TYPE)?) {
        Some(action_type) => vec![Document::from_pairs([
            (action::TYPE, Document::String(action_type)),
            (
                action::DATA,
                row.opt_str_field(columns::ACTION_DATA)?.unwrap_or_default().into(),
            ),
            (
                action::EXTRAS,
                Document::List(action_extras(row.opt_str_field(columns::ACTION_EXTRAS)?)?),
            ),
            (action::FLAGS, Document::Int(moved_bits(flags, V1_TO_V2_ACTION))),
        ])],
        None => Vec::new(),
    };

    let click_type = if has_flag(flags, v1::KEYMAP_LONG_PRESS) {
        key::CLICK_LONG_PRESS
    } else {
        key::CLICK_SHORT_PRESS
    };

    let old_triggers = row.list_field(columns::TRIGGER_LIST)?;
    let triggers = if old_triggers.is_empty() {
        vec![new_trigger(Vec::new())]
    } else {
        old_triggers
            .iter()
            .map(|old| trigger_keys(old, click_type).map(new_trigger))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut keymaps: Vec<Document> = triggers
        .into_iter()
        .map(|trigger| {
            Document::from_pairs([
                (columns::TRIGGER, trigger),
                (columns::ACTION_LIST, Document::List(action_list.clone())),
                (columns::CONSTRAINT_LIST, Document::List(Vec::new())),
                (columns::CONSTRAINT_MODE, Document::Int(CONSTRAINT_MODE_OR)),
                (columns::FLAGS, Document::Int(moved_bits(flags, V1_TO_V2_KEYMAP))),
                // encoded as SQL NULL, not the string "NULL"
                (columns::FOLDER_NAME, Document::Null),
                (columns::IS_ENABLED, Document::Int(is_enabled)),
            ])
        })
        .collect();

    // a detached document keeps its id on the first key map; split rows get theirs from storage
    if let (Some(id), Some(first)) = (row.get(columns::ID), keymaps.first_mut()) {
        first.set(columns::ID, id.clone())?;
    }
    Ok(keymaps)
}
