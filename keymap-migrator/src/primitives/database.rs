use std::collections::HashMap;

use thiserror::Error;

/// Errors raised by the host database.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum DatabaseError {
    /// A statement or query was rejected by the storage engine
    #[error("statement failed: {message}")]
    StatementFailure {
        /// The engine's message
        message: String,
    },
    /// A transaction could not be started, committed or rolled back
    #[error("transaction failed: {message}")]
    TransactionFailure {
        /// The engine's message
        message: String,
    },
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for DatabaseError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// A single SQLite column value.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SqlValue {
    /// `NULL`
    Null,
    /// `INTEGER` (booleans are stored as 0/1)
    Integer {
        /// The stored integer
        value: i64,
    },
    /// `TEXT`
    Text {
        /// The stored text
        value: String,
    },
}

/// One table row keyed by its integer primary key.
///
/// `columns` never contains `id`; the key is carried separately so it cannot be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TableRow {
    /// Primary key
    pub id: i64,
    /// Every other column of the row
    pub columns: HashMap<String, SqlValue>,
}

/// A `(key, value)` pair read from a two-column lookup table.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ColumnPair {
    /// Value of the key column
    pub key: String,
    /// Value of the value column, `None` for SQL `NULL`
    pub value: Option<String>,
}

/// The relational store that holds key maps, implemented by the host on top of Room's
/// `SupportSQLiteDatabase`.
///
/// The migrator drives transactions explicitly: every version step runs between one
/// `begin_transaction` and one `commit_transaction` (or `rollback_transaction`), and the schema
/// version is written inside that transaction so it only becomes visible with the step's data.
///
/// Table and column names passed to this trait are fixed identifiers owned by the migrator,
/// never user input.
#[uniffi::export(with_foreign)]
pub trait MigrationDatabase: Send + Sync {
    /// The database's schema version (`PRAGMA user_version`).
    ///
    /// # Errors
    /// - `DatabaseError::StatementFailure` if the version cannot be read
    fn schema_version(&self) -> Result<u32, DatabaseError>;

    /// Sets the schema version.
    ///
    /// # Errors
    /// - `DatabaseError::StatementFailure` if the version cannot be written
    fn set_schema_version(&self, version: u32) -> Result<(), DatabaseError>;

    /// Starts a transaction.
    ///
    /// # Errors
    /// - `DatabaseError::TransactionFailure` if a transaction cannot be started
    fn begin_transaction(&self) -> Result<(), DatabaseError>;

    /// Commits the open transaction.
    ///
    /// # Errors
    /// - `DatabaseError::TransactionFailure` if the commit fails; the data is then rolled back
    fn commit_transaction(&self) -> Result<(), DatabaseError>;

    /// Discards the open transaction.
    ///
    /// # Errors
    /// - `DatabaseError::TransactionFailure` if no transaction is open
    fn rollback_transaction(&self) -> Result<(), DatabaseError>;

    /// Executes a DDL statement.
    ///
    /// # Errors
    /// - `DatabaseError::StatementFailure` if the statement is rejected
    fn run_statement(&self, sql: String) -> Result<(), DatabaseError>;

    /// Reads up to `limit` rows with `id > after_id` (all rows when `after_id` is `None`),
    /// ordered by ascending id.
    ///
    /// # Errors
    /// - `DatabaseError::StatementFailure` if the table cannot be read
    fn read_rows(
        &self,
        table: String,
        after_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<TableRow>, DatabaseError>;

    /// Inserts the rows, replacing any existing row with the same id.
    ///
    /// # Errors
    /// - `DatabaseError::StatementFailure` if a row is rejected
    fn write_rows(&self, table: String, rows: Vec<TableRow>) -> Result<(), DatabaseError>;

    /// Reads every `(key_column, value_column)` pair of a table.
    ///
    /// # Errors
    /// - `DatabaseError::StatementFailure` if the table or a column does not exist
    fn read_pairs(
        &self,
        table: String,
        key_column: String,
        value_column: String,
    ) -> Result<Vec<ColumnPair>, DatabaseError>;
}

#[cfg(test)]
pub use in_memory::InMemoryMigrationDatabase;

#[cfg(test)]
#[allow(dead_code, missing_docs)]
mod in_memory {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    use super::{ColumnPair, DatabaseError, MigrationDatabase, SqlValue, TableRow};

    #[derive(Debug, Clone, Default)]
    struct State {
        version: u32,
        tables: HashMap<String, BTreeMap<i64, HashMap<String, SqlValue>>>,
        statements: Vec<String>,
    }

    /// Transactional in-memory database for unit tests.
    ///
    /// DDL statements are recorded, not interpreted; `CREATE TABLE`, `DROP TABLE` and
    /// `ALTER TABLE .. RENAME TO ..` are mirrored onto the table map so the executor's table
    /// juggling can be asserted.
    #[derive(Debug, Default)]
    pub struct InMemoryMigrationDatabase {
        state: Mutex<State>,
        snapshot: Mutex<Option<State>>,
        fail_statement_containing: Mutex<Option<String>>,
    }

    impl InMemoryMigrationDatabase {
        pub fn new(version: u32) -> Self {
            let db = Self::default();
            db.state.lock().unwrap().version = version;
            db
        }

        pub fn insert(&self, table: &str, id: i64, columns: &[(&str, SqlValue)]) {
            self.state
                .lock()
                .unwrap()
                .tables
                .entry(table.to_string())
                .or_default()
                .insert(
                    id,
                    columns
                        .iter()
                        .map(|(name, value)| ((*name).to_string(), value.clone()))
                        .collect(),
                );
        }

        pub fn rows(&self, table: &str) -> Vec<TableRow> {
            self.state
                .lock()
                .unwrap()
                .tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .map(|(id, columns)| TableRow {
                            id: *id,
                            columns: columns.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        pub fn has_table(&self, table: &str) -> bool {
            self.state.lock().unwrap().tables.contains_key(table)
        }

        pub fn statements(&self) -> Vec<String> {
            self.state.lock().unwrap().statements.clone()
        }

        pub fn in_transaction(&self) -> bool {
            self.snapshot.lock().unwrap().is_some()
        }

        pub fn fail_statements_containing(&self, needle: &str) {
            *self.fail_statement_containing.lock().unwrap() = Some(needle.to_string());
        }

        fn apply_ddl(state: &mut State, sql: &str) {
            let words: Vec<&str> = sql
                .split_whitespace()
                .map(|word| word.trim_matches(|c| c == '`' || c == '(' || c == '\''))
                .collect();
            match words.as_slice() {
                ["CREATE", "TABLE", "IF", "NOT", "EXISTS", name, ..]
                | ["CREATE", "TABLE", name, ..] => {
                    state.tables.entry((*name).to_string()).or_default();
                }
                ["DROP", "TABLE", "IF", "EXISTS", name, ..] | ["DROP", "TABLE", name, ..] => {
                    state.tables.remove(*name);
                }
                ["ALTER", "TABLE", from, "RENAME", "TO", to, ..] => {
                    if let Some(rows) = state.tables.remove(*from) {
                        state.tables.insert((*to).to_string(), rows);
                    }
                }
                _ => {}
            }
        }
    }

    impl MigrationDatabase for InMemoryMigrationDatabase {
        fn schema_version(&self) -> Result<u32, DatabaseError> {
            Ok(self.state.lock().unwrap().version)
        }

        fn set_schema_version(&self, version: u32) -> Result<(), DatabaseError> {
            self.state.lock().unwrap().version = version;
            Ok(())
        }

        fn begin_transaction(&self) -> Result<(), DatabaseError> {
            let mut snapshot = self.snapshot.lock().unwrap();
            if snapshot.is_some() {
                return Err(DatabaseError::TransactionFailure {
                    message: "transaction already open".to_string(),
                });
            }
            *snapshot = Some(self.state.lock().unwrap().clone());
            Ok(())
        }

        fn commit_transaction(&self) -> Result<(), DatabaseError> {
            self.snapshot
                .lock()
                .unwrap()
                .take()
                .map(|_| ())
                .ok_or_else(|| DatabaseError::TransactionFailure {
                    message: "no open transaction".to_string(),
                })
        }

        fn rollback_transaction(&self) -> Result<(), DatabaseError> {
            let previous = self.snapshot.lock().unwrap().take().ok_or_else(|| {
                DatabaseError::TransactionFailure {
                    message: "no open transaction".to_string(),
                }
            })?;
            *self.state.lock().unwrap() = previous;
            Ok(())
        }

        fn run_statement(&self, sql: String) -> Result<(), DatabaseError> {
            if let Some(needle) = self.fail_statement_containing.lock().unwrap().as_deref() {
                if sql.contains(needle) {
                    return Err(DatabaseError::StatementFailure {
                        message: format!("rejected: {sql}"),
                    });
                }
            }
            let mut state = self.state.lock().unwrap();
            Self::apply_ddl(&mut state, &sql);
            state.statements.push(sql);
            Ok(())
        }

        fn read_rows(
            &self,
            table: String,
            after_id: Option<i64>,
            limit: u32,
        ) -> Result<Vec<TableRow>, DatabaseError> {
            let state = self.state.lock().unwrap();
            let rows = state.tables.get(&table).ok_or_else(|| {
                DatabaseError::StatementFailure {
                    message: format!("no such table: {table}"),
                }
            })?;
            Ok(rows
                .iter()
                .filter(|(id, _)| after_id.is_none_or(|after| **id > after))
                .take(limit as usize)
                .map(|(id, columns)| TableRow {
                    id: *id,
                    columns: columns.clone(),
                })
                .collect())
        }

        fn write_rows(&self, table: String, rows: Vec<TableRow>) -> Result<(), DatabaseError> {
            let mut state = self.state.lock().unwrap();
            let target = state.tables.get_mut(&table).ok_or_else(|| {
                DatabaseError::StatementFailure {
                    message: format!("no such table: {table}"),
                }
            })?;
            for row in rows {
                target.insert(row.id, row.columns);
            }
            Ok(())
        }

        fn read_pairs(
            &self,
            table: String,
            key_column: String,
            value_column: String,
        ) -> Result<Vec<ColumnPair>, DatabaseError> {
            let state = self.state.lock().unwrap();
            let rows = state.tables.get(&table).ok_or_else(|| {
                DatabaseError::StatementFailure {
                    message: format!("no such table: {table}"),
                }
            })?;
            Ok(rows
                .values()
                .filter_map(|columns| match columns.get(&key_column) {
                    Some(SqlValue::Text { value: key }) => Some(ColumnPair {
                        key: key.clone(),
                        value: match columns.get(&value_column) {
                            Some(SqlValue::Text { value }) => Some(value.clone()),
                            _ => None,
                        },
                    }),
                    _ => None,
                })
                .collect())
        }
    }
}
