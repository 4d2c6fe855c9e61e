use std::collections::HashMap;
use std::sync::Arc;

use crate::document::Document;
use crate::families::keymap::schema::{fingerprint_columns, FINGERPRINT_MAPS_TABLE};
use crate::migration::MigrationResult;
use crate::migration::executor;
use crate::migration::registry::MigrationRegistry;
use crate::migration::step::{MigrationStep, StepContext};
use crate::migration::table::RowImport;
use crate::primitives::database::{SqlValue, TableRow};
use crate::primitives::preferences::PreferenceStore;

use super::{fields, stored_version, LEGACY_GESTURES, TABLE_VERSION};

/// Moves the preference-backed fingerprint maps into `fingerprintmaps` during the key map
/// 11 to 12 step. Each map is first brought to version 12 through the fingerprint family.
///
/// Preferences are only read, so a rolled back step can import them again.
pub struct LegacyFingerprintImport {
    preferences: Arc<dyn PreferenceStore>,
    registry: Arc<MigrationRegistry<MigrationStep>>,
}

impl LegacyFingerprintImport {
    /// Imports from `preferences` using the fingerprint `registry`.
    #[must_use]
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        registry: Arc<MigrationRegistry<MigrationStep>>,
    ) -> Self {
        Self {
            preferences,
            registry,
        }
    }
}

fn json_column(map: &Document, field: &str) -> SqlValue {
    let value = match map.get(field) {
        None | Some(Document::Null) => "[]".to_string(),
        Some(value) => value.to_json_string(),
    };
    SqlValue::Text { value }
}

fn int_column(map: &Document, field: &str, default: i64) -> MigrationResult<SqlValue> {
    Ok(SqlValue::Integer {
        value: map.opt_int_field(field)?.unwrap_or(default),
    })
}

/// Encodes a version 12 map as a `fingerprintmaps` row.
fn table_row(map: &Document) -> MigrationResult<TableRow> {
    let columns = HashMap::from([
        (
            fingerprint_columns::ACTION_LIST.to_string(),
            json_column(map, fields::ACTION_LIST),
        ),
        (
            fingerprint_columns::CONSTRAINT_LIST.to_string(),
            json_column(map, fields::CONSTRAINTS),
        ),
        (
            fingerprint_columns::CONSTRAINT_MODE.to_string(),
            int_column(map, fields::CONSTRAINT_MODE, 1)?,
        ),
        (
            fingerprint_columns::EXTRAS.to_string(),
            json_column(map, fields::EXTRAS),
        ),
        (
            fingerprint_columns::FLAGS.to_string(),
            int_column(map, fields::FLAGS, 0)?,
        ),
        (
            fingerprint_columns::IS_ENABLED.to_string(),
            int_column(map, fields::ENABLED, 1)?,
        ),
    ]);

    Ok(TableRow {
        id: map.int_field(fields::ID)?,
        columns,
    })
}

impl RowImport for LegacyFingerprintImport {
    fn destination(&self) -> &str {
        FINGERPRINT_MAPS_TABLE
    }

    fn rows(&self, context: &StepContext<'_>) -> MigrationResult<Vec<TableRow>> {
        let mut rows = Vec::with_capacity(LEGACY_GESTURES.len());
        for (gesture, _) in LEGACY_GESTURES {
            let Some(json) = self.preferences.read_value(gesture.to_string())? else {
                continue;
            };
            let map = Document::parse(&json)?;
            let version = stored_version(&map)?;
            let migrated = executor::migrate(
                &self.registry,
                version,
                TABLE_VERSION,
                map,
                &context.with_record_key(gesture),
            )?;
            rows.push(table_row(&migrated)?);
        }

        crate::info!(
            "fingerprint_map.imported rows={} table={}",
            rows.len(),
            FINGERPRINT_MAPS_TABLE
        );
        Ok(rows)
    }
}
