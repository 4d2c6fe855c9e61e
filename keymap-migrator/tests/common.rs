#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use keymap_migrator::primitives::database::{
    ColumnPair, DatabaseError, MigrationDatabase, SqlValue, TableRow,
};
use keymap_migrator::primitives::preferences::{PreferenceStore, PreferenceStoreError};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};

/// Schema of a key map database at version 1.
pub const VERSION_1_SCHEMA: &str = "CREATE TABLE `keymaps` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `trigger_list` TEXT, `flags` INTEGER NOT NULL, `is_enabled` INTEGER NOT NULL, `action_type` TEXT, `action_data` TEXT, `action_extras` TEXT)";

/// Schema of a key map database at versions 7 to 11.
pub const VERSION_11_SCHEMA: &str = "CREATE TABLE `keymaps` (`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, `trigger` TEXT NOT NULL, `action_list` TEXT NOT NULL, `constraint_list` TEXT NOT NULL, `constraint_mode` INTEGER NOT NULL, `flags` INTEGER NOT NULL, `folder_name` TEXT, `is_enabled` INTEGER NOT NULL, `uid` TEXT NOT NULL DEFAULT '');
CREATE TABLE `deviceinfo` (`descriptor` TEXT NOT NULL, `name` TEXT NOT NULL, PRIMARY KEY(`descriptor`));";

fn statement_failure(e: &rusqlite::Error) -> DatabaseError {
    DatabaseError::StatementFailure {
        message: e.to_string(),
    }
}

fn transaction_failure(e: &rusqlite::Error) -> DatabaseError {
    DatabaseError::TransactionFailure {
        message: e.to_string(),
    }
}

/// A real SQLite database standing in for Room's `SupportSQLiteDatabase`.
pub struct SqliteDatabase {
    connection: Mutex<Connection>,
}

impl SqliteDatabase {
    /// An in-memory database created from `schema` and stamped with `version`.
    pub fn open(version: u32, schema: &str) -> anyhow::Result<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(schema)?;
        connection.pragma_update(None, "user_version", version)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Runs arbitrary SQL, for seeding and tampering.
    pub fn execute(&self, sql: &str) -> anyhow::Result<()> {
        self.connection.lock().unwrap().execute_batch(sql)?;
        Ok(())
    }

    /// Whether `table` exists.
    pub fn has_table(&self, table: &str) -> anyhow::Result<bool> {
        let count: i64 = self.connection.lock().unwrap().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Ids of the rows whose `column` is SQL `NULL`, ordered by id.
    pub fn null_ids(&self, table: &str, column: &str) -> anyhow::Result<Vec<i64>> {
        let connection = self.connection.lock().unwrap();
        let mut statement = connection.prepare(&format!(
            "SELECT `id` FROM `{table}` WHERE `{column}` IS NULL ORDER BY `id`"
        ))?;
        let ids = statement
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// `(id, value)` of a text column for every row, ordered by id.
    pub fn text_column(&self, table: &str, column: &str) -> anyhow::Result<Vec<(i64, String)>> {
        let connection = self.connection.lock().unwrap();
        let mut statement =
            connection.prepare(&format!("SELECT `id`, `{column}` FROM `{table}` ORDER BY `id`"))?;
        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl MigrationDatabase for SqliteDatabase {
    fn schema_version(&self) -> Result<u32, DatabaseError> {
        self.connection
            .lock()
            .unwrap()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| statement_failure(&e))
    }

    fn set_schema_version(&self, version: u32) -> Result<(), DatabaseError> {
        self.connection
            .lock()
            .unwrap()
            .pragma_update(None, "user_version", version)
            .map_err(|e| statement_failure(&e))
    }

    fn begin_transaction(&self) -> Result<(), DatabaseError> {
        self.connection
            .lock()
            .unwrap()
            .execute_batch("BEGIN")
            .map_err(|e| transaction_failure(&e))
    }

    fn commit_transaction(&self) -> Result<(), DatabaseError> {
        self.connection
            .lock()
            .unwrap()
            .execute_batch("COMMIT")
            .map_err(|e| transaction_failure(&e))
    }

    fn rollback_transaction(&self) -> Result<(), DatabaseError> {
        self.connection
            .lock()
            .unwrap()
            .execute_batch("ROLLBACK")
            .map_err(|e| transaction_failure(&e))
    }

    fn run_statement(&self, sql: String) -> Result<(), DatabaseError> {
        self.connection
            .lock()
            .unwrap()
            .execute_batch(&sql)
            .map_err(|e| statement_failure(&e))
    }

    fn read_rows(
        &self,
        table: String,
        after_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<TableRow>, DatabaseError> {
        let connection = self.connection.lock().unwrap();
        let mut statement = connection
            .prepare(&format!("SELECT * FROM `{table}` WHERE `id` > ?1 ORDER BY `id` LIMIT ?2"))
            .map_err(|e| statement_failure(&e))?;
        let names: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let rows = statement
            .query_map((after_id.unwrap_or(i64::MIN), limit), |row| {
                let mut id = 0;
                let mut columns = HashMap::new();
                for (index, name) in names.iter().enumerate() {
                    let value = match row.get_ref(index)? {
                        ValueRef::Null => SqlValue::Null,
                        ValueRef::Integer(value) => SqlValue::Integer { value },
                        ValueRef::Real(value) => SqlValue::Text {
                            value: value.to_string(),
                        },
                        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => SqlValue::Text {
                            value: String::from_utf8_lossy(bytes).into_owned(),
                        },
                    };
                    match (name.as_str(), value) {
                        ("id", SqlValue::Integer { value }) => id = value,
                        (_, value) => {
                            columns.insert(name.clone(), value);
                        }
                    }
                }
                Ok(TableRow { id, columns })
            })
            .map_err(|e| statement_failure(&e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| statement_failure(&e))?;
        Ok(rows)
    }

    fn write_rows(&self, table: String, rows: Vec<TableRow>) -> Result<(), DatabaseError> {
        let connection = self.connection.lock().unwrap();
        for row in rows {
            let mut names: Vec<&String> = row.columns.keys().collect();
            names.sort();

            let column_list = std::iter::once("id")
                .chain(names.iter().map(|name| name.as_str()))
                .map(|name| format!("`{name}`"))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; names.len() + 1].join(", ");
            let values = std::iter::once(Value::Integer(row.id)).chain(names.iter().map(
                |name| match &row.columns[*name] {
                    SqlValue::Null => Value::Null,
                    SqlValue::Integer { value } => Value::Integer(*value),
                    SqlValue::Text { value } => Value::Text(value.clone()),
                },
            ));

            connection
                .execute(
                    &format!("INSERT OR REPLACE INTO `{table}` ({column_list}) VALUES ({placeholders})"),
                    params_from_iter(values),
                )
                .map_err(|e| statement_failure(&e))?;
        }
        Ok(())
    }

    fn read_pairs(
        &self,
        table: String,
        key_column: String,
        value_column: String,
    ) -> Result<Vec<ColumnPair>, DatabaseError> {
        let connection = self.connection.lock().unwrap();
        let mut statement = connection
            .prepare(&format!("SELECT `{key_column}`, `{value_column}` FROM `{table}`"))
            .map_err(|e| statement_failure(&e))?;
        let pairs = statement
            .query_map([], |row| {
                Ok(ColumnPair {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            })
            .map_err(|e| statement_failure(&e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| statement_failure(&e))?;
        Ok(pairs)
    }
}

/// Preferences kept in a map, standing in for `DataStore`.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let preferences = Self::default();
        for (key, value) in entries {
            preferences
                .values
                .lock()
                .unwrap()
                .insert((*key).to_string(), (*value).to_string());
        }
        preferences
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn read_value(&self, key: String) -> Result<Option<String>, PreferenceStoreError> {
        Ok(self.values.lock().unwrap().get(&key).cloned())
    }

    fn write_value(&self, key: String, value: String) -> Result<(), PreferenceStoreError> {
        self.values.lock().unwrap().insert(key, value);
        Ok(())
    }

    fn remove_value(&self, key: String) -> Result<(), PreferenceStoreError> {
        self.values.lock().unwrap().remove(&key);
        Ok(())
    }
}
