//! Helpers for `extras` lists: `[{"id": "...", "data": "..."}]`.

use super::Document;

const EXTRA_ID: &str = "id";
const EXTRA_DATA: &str = "data";

fn has_id(extra: &Document, id: &str) -> bool {
    extra.get(EXTRA_ID).and_then(Document::as_str) == Some(id)
}

/// The `data` of the first extra with `id`.
#[must_use]
pub fn extra_data<'a>(extras: &'a [Document], id: &str) -> Option<&'a str> {
    extras
        .iter()
        .find(|extra| has_id(extra, id))
        .and_then(|extra| extra.get(EXTRA_DATA))
        .and_then(Document::as_str)
}

/// Removes every extra with `id`, returning the first one removed.
pub fn remove_extra(extras: &mut Vec<Document>, id: &str) -> Option<Document> {
    let position = extras.iter().position(|extra| has_id(extra, id))?;
    let removed = extras.remove(position);
    extras.retain(|extra| !has_id(extra, id));
    Some(removed)
}

/// Sets the extra `id` to `data`, replacing an existing entry in place or appending.
pub fn set_extra(extras: &mut Vec<Document>, id: &str, data: &str) {
    let extra = Document::from_pairs([(EXTRA_ID, Document::from(id)), (EXTRA_DATA, data.into())]);
    match extras.iter_mut().find(|existing| has_id(existing, id)) {
        Some(existing) => *existing = extra,
        None => extras.push(extra),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extras() -> Vec<Document> {
        Document::parse(
            r#"[{"id":"extra_repeat_delay","data":"200"},{"id":"extra_vibration_duration","data":"50"}]"#,
        )
        .unwrap()
        .as_list()
        .unwrap()
        .to_vec()
    }

    #[test]
    fn test_extra_data_lookup() {
        let extras = extras();
        assert_eq!(extra_data(&extras, "extra_repeat_delay"), Some("200"));
        assert_eq!(extra_data(&extras, "extra_device_descriptor"), None);
    }

    #[test]
    fn test_remove_extra_removes_duplicates() {
        let mut extras = extras();
        set_extra(&mut extras, "extra_vibration_duration", "50");
        extras.push(extras[0].clone());

        let removed = remove_extra(&mut extras, "extra_repeat_delay").unwrap();
        assert_eq!(removed.get("data"), Some(&Document::from("200")));
        assert_eq!(extras.len(), 1);
        assert_eq!(remove_extra(&mut extras, "extra_repeat_delay"), None);
    }

    #[test]
    fn test_set_extra_replaces_in_place() {
        let mut extras = extras();
        set_extra(&mut extras, "extra_repeat_delay", "300");
        set_extra(&mut extras, "extra_device_name", "");

        assert_eq!(extras.len(), 3);
        assert_eq!(extra_data(&extras, "extra_repeat_delay"), Some("300"));
        assert_eq!(
            Document::List(extras).to_json_string(),
            r#"[{"data":"300","id":"extra_repeat_delay"},{"data":"50","id":"extra_vibration_duration"},{"data":"","id":"extra_device_name"}]"#
        );
    }
}
