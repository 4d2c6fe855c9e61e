use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;

use crate::document::Document;
use crate::migration::cross_reference::{resolve_snapshot, DeviceInfoTable, DeviceNameSnapshot};
use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::registry::MigrationRegistry;
use crate::migration::step::{MigrationStep, StepContext, VersionedStep};
use crate::primitives::config::{current_config, MigratorConfig};
use crate::primitives::database::{MigrationDatabase, SqlValue, TableRow};

/// Name of the primary key column, carried outside the transformed document.
pub const ID_COLUMN: &str = "id";

/// Rows that a step adds from outside the table being migrated, e.g. records that used to live
/// in preferences and move into a new table.
pub trait RowImport: Send + Sync {
    /// Table the rows are written to. Must exist once the step's `before` DDL ran.
    fn destination(&self) -> &str;

    /// Produces the rows to insert.
    ///
    /// # Errors
    /// Any error aborts and rolls back the step.
    fn rows(&self, context: &StepContext<'_>) -> MigrationResult<Vec<TableRow>>;
}

/// Everything a table step does besides transforming documents.
#[derive(Clone)]
pub struct TablePlan {
    source: &'static str,
    destination: &'static str,
    json_columns_in: &'static [&'static str],
    json_columns_out: &'static [&'static str],
    before: &'static [&'static str],
    after: &'static [&'static str],
    device_names_from: Option<&'static str>,
    imports: Vec<Arc<dyn RowImport>>,
}

impl TablePlan {
    /// Rows are read from and written back to `table`; `json_columns` hold serialized
    /// documents on both sides.
    #[must_use]
    pub const fn in_place(table: &'static str, json_columns: &'static [&'static str]) -> Self {
        Self {
            source: table,
            destination: table,
            json_columns_in: json_columns,
            json_columns_out: json_columns,
            before: &[],
            after: &[],
            device_names_from: None,
            imports: Vec::new(),
        }
    }

    /// Rows are read from `source` and written to `destination`, which the `before` DDL
    /// usually creates.
    #[must_use]
    pub const fn copying(
        source: &'static str,
        json_columns_in: &'static [&'static str],
        destination: &'static str,
        json_columns_out: &'static [&'static str],
    ) -> Self {
        Self {
            source,
            destination,
            json_columns_in,
            json_columns_out,
            before: &[],
            after: &[],
            device_names_from: None,
            imports: Vec::new(),
        }
    }

    /// DDL run before any row is read.
    #[must_use]
    pub const fn with_before(mut self, statements: &'static [&'static str]) -> Self {
        self.before = statements;
        self
    }

    /// DDL run after every row was written.
    #[must_use]
    pub const fn with_after(mut self, statements: &'static [&'static str]) -> Self {
        self.after = statements;
        self
    }

    /// Captures device names from `table` before transforming.
    #[must_use]
    pub const fn with_device_names_from(mut self, table: &'static str) -> Self {
        self.device_names_from = Some(table);
        self
    }

    /// Adds rows from another source once the table itself is migrated.
    #[must_use]
    pub fn with_import(mut self, import: Arc<dyn RowImport>) -> Self {
        self.imports.push(import);
        self
    }

    /// Table rows are read from.
    #[must_use]
    pub const fn source(&self) -> &'static str {
        self.source
    }

    /// Table rows are written to.
    #[must_use]
    pub const fn destination(&self) -> &'static str {
        self.destination
    }
}

/// A document step bound to the table operations around it.
#[derive(Clone)]
pub struct TableStep {
    step: MigrationStep,
    plan: TablePlan,
}

impl TableStep {
    /// Binds `step` to `plan`.
    #[must_use]
    pub const fn new(step: MigrationStep, plan: TablePlan) -> Self {
        Self { step, plan }
    }

    /// The document step.
    #[must_use]
    pub const fn step(&self) -> &MigrationStep {
        &self.step
    }

    /// The table operations.
    #[must_use]
    pub const fn plan(&self) -> &TablePlan {
        &self.plan
    }
}

impl VersionedStep for TableStep {
    fn version_before(&self) -> u32 {
        self.step.version_before()
    }

    fn version_after(&self) -> u32 {
        self.step.version_after()
    }

    fn name(&self) -> &str {
        self.step.name()
    }
}

/// Outcome of one committed table step.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StepReport {
    /// Version before the step
    pub version_before: u32,
    /// Version after the step
    pub version_after: u32,
    /// Rows written to the destination table, including split and imported rows
    pub rows_written: u64,
}

/// Outcome of a table migration.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TableMigrationReport {
    /// Record family
    pub family: String,
    /// Schema version found in the database
    pub from_version: u32,
    /// Schema version the database is at now
    pub to_version: u32,
    /// One entry per committed step
    pub steps: Vec<StepReport>,
}

/// Migrates every row of a table, one transaction per version step.
pub struct TableMigrator<'a> {
    database: &'a dyn MigrationDatabase,
    config: MigratorConfig,
}

impl<'a> TableMigrator<'a> {
    /// A migrator using the installed [`MigratorConfig`].
    #[must_use]
    pub fn new(database: &'a dyn MigrationDatabase) -> Self {
        Self::with_config(database, current_config())
    }

    /// A migrator with an explicit config.
    #[must_use]
    pub const fn with_config(database: &'a dyn MigrationDatabase, config: MigratorConfig) -> Self {
        Self { database, config }
    }

    /// Moves the database from its stored schema version to `target`.
    ///
    /// Each step commits on its own together with the new schema version, so a failure leaves
    /// the database at the version of the last committed step and a later run resumes from
    /// there.
    ///
    /// # Errors
    /// - chain resolution errors, before anything is touched
    /// - `RowTransformFailure` or `Database` for the failing step, after its rollback
    pub fn migrate_table(
        &self,
        registry: &MigrationRegistry<TableStep>,
        target: u32,
    ) -> MigrationResult<TableMigrationReport> {
        let from_version = self.database.schema_version()?;
        let chain = registry.resolve(from_version, target)?;

        let mut report = TableMigrationReport {
            family: registry.family().to_string(),
            from_version,
            to_version: from_version,
            steps: Vec::with_capacity(chain.len()),
        };

        for step in chain.steps() {
            let rows_written = self.run_step(registry.family(), step)?;
            report.to_version = step.version_after();
            report.steps.push(StepReport {
                version_before: step.version_before(),
                version_after: step.version_after(),
                rows_written,
            });
        }

        Ok(report)
    }

    fn run_step(&self, family: &str, step: &TableStep) -> MigrationResult<u64> {
        let started = Utc::now();
        self.database.begin_transaction()?;

        match self.apply_step(step) {
            Ok(rows_written) => {
                self.database.commit_transaction()?;
                crate::info!(
                    "migration_step.committed family={} from={} to={} name={} rows={} duration_ms={} timestamp={}",
                    family,
                    step.version_before(),
                    step.version_after(),
                    step.name(),
                    rows_written,
                    (Utc::now() - started).num_milliseconds(),
                    Utc::now().to_rfc3339()
                );
                Ok(rows_written)
            }
            Err(e) => {
                if let Err(rollback) = self.database.rollback_transaction() {
                    crate::error!(
                        "migration_step.rollback_failed family={} from={} error={} timestamp={}",
                        family,
                        step.version_before(),
                        rollback,
                        Utc::now().to_rfc3339()
                    );
                }
                crate::error!(
                    "migration_step.rolled_back family={} from={} to={} error_code={} error_message={} timestamp={}",
                    family,
                    step.version_before(),
                    step.version_after(),
                    e.code(),
                    e,
                    Utc::now().to_rfc3339()
                );
                Err(e)
            }
        }
    }

    fn apply_step(&self, step: &TableStep) -> MigrationResult<u64> {
        let plan = step.plan();
        for sql in plan.before {
            self.database.run_statement((*sql).to_string())?;
        }

        let snapshot = plan.device_names_from.map_or_else(DeviceNameSnapshot::empty, |table| {
            resolve_snapshot(&DeviceInfoTable::new(self.database, table))
        });

        let batch_size = self.config.row_batch_size();
        let mut rows_written: u64 = 0;
        let mut after_id = None;
        let mut max_id: Option<i64> = None;
        // documents split off a source row, written once every source id is known
        let mut split_off: Vec<(i64, Document)> = Vec::new();

        loop {
            let batch = self.database.read_rows(
                plan.source.to_string(),
                after_id,
                batch_size,
            )?;
            let Some(last) = batch.last() else {
                break;
            };
            after_id = Some(last.id);
            max_id = max_id.max(Some(last.id));

            let transformed = self.transform_batch(step, &batch, &snapshot)?;

            let mut rows = Vec::with_capacity(transformed.len());
            for (id, documents) in transformed {
                let mut documents = documents.into_iter();
                if let Some(first) = documents.next() {
                    rows.push(encode_row(step, id, id, first)?);
                }
                split_off.extend(documents.map(|document| (id, document)));
            }
            rows_written += rows.len() as u64;
            self.database.write_rows(plan.destination.to_string(), rows)?;

            if batch.len() < batch_size as usize {
                break;
            }
        }

        if !split_off.is_empty() {
            let mut next_id = max_id.unwrap_or(0);
            let rows = split_off
                .into_iter()
                .map(|(source_id, document)| {
                    next_id += 1;
                    encode_row(step, source_id, next_id, document)
                })
                .collect::<MigrationResult<Vec<_>>>()?;
            rows_written += rows.len() as u64;
            self.database.write_rows(plan.destination.to_string(), rows)?;
        }

        let context = StepContext::detached(&snapshot);
        for import in &plan.imports {
            let rows = import.rows(&context)?;
            rows_written += rows.len() as u64;
            self.database
                .write_rows(import.destination().to_string(), rows)?;
        }

        for sql in plan.after {
            self.database.run_statement((*sql).to_string())?;
        }

        self.database.set_schema_version(step.version_after())?;
        Ok(rows_written)
    }

    fn transform_batch(
        &self,
        step: &TableStep,
        batch: &[TableRow],
        snapshot: &DeviceNameSnapshot,
    ) -> MigrationResult<Vec<(i64, Vec<Document>)>> {
        let transform = |row: &TableRow| transform_row(step, row, snapshot);

        // collect keeps input order on both paths
        if self.config.parallel_row_transforms() {
            batch.par_iter().map(transform).collect()
        } else {
            batch.iter().map(transform).collect()
        }
    }
}

fn row_failure(step: &TableStep, row_id: i64, field: &str, message: String) -> MigrationError {
    MigrationError::RowTransformFailure {
        table: step.plan().source().to_string(),
        row_id,
        version_before: step.version_before(),
        field: field.to_string(),
        message,
    }
}

fn transform_row(
    step: &TableStep,
    row: &TableRow,
    snapshot: &DeviceNameSnapshot,
) -> MigrationResult<(i64, Vec<Document>)> {
    let document = decode_row(step, row)?;
    let context = StepContext::detached(snapshot).with_record_id(Some(row.id));

    let documents = step
        .step()
        .transform()
        .apply(document, &context)
        .map_err(|e| row_failure(step, row.id, e.field(), e.to_string()))?;
    if documents.is_empty() {
        return Err(row_failure(
            step,
            row.id,
            "",
            format!("step `{}` produced no record", step.name()),
        ));
    }

    Ok((row.id, documents))
}

fn decode_row(step: &TableStep, row: &TableRow) -> MigrationResult<Document> {
    let json_columns = step.plan().json_columns_in;
    let mut fields = std::collections::BTreeMap::new();

    for (column, value) in &row.columns {
        let document = match value {
            SqlValue::Null => Document::Null,
            SqlValue::Integer { value } => Document::Int(*value),
            SqlValue::Text { value } if json_columns.contains(&column.as_str()) => {
                Document::parse(value)
                    .map_err(|e| row_failure(step, row.id, column, e.to_string()))?
            }
            SqlValue::Text { value } => Document::String(value.clone()),
        };
        fields.insert(column.clone(), document);
    }

    Ok(Document::Map(fields))
}

fn encode_row(
    step: &TableStep,
    source_id: i64,
    id: i64,
    document: Document,
) -> MigrationResult<TableRow> {
    let Document::Map(fields) = document else {
        return Err(row_failure(
            step,
            source_id,
            "",
            format!("step `{}` produced a {} instead of a record", step.name(), document.kind()),
        ));
    };
    let json_columns = step.plan().json_columns_out;

    let columns: HashMap<String, SqlValue> = fields
        .into_iter()
        .filter(|(column, _)| column != ID_COLUMN)
        .map(|(column, document)| {
            let value = if json_columns.contains(&column.as_str()) {
                SqlValue::Text {
                    value: document.to_json_string(),
                }
            } else {
                column_value(document)
            };
            (column, value)
        })
        .collect();

    Ok(TableRow { id, columns })
}

fn column_value(document: Document) -> SqlValue {
    match document {
        Document::Null => SqlValue::Null,
        Document::Bool(b) => SqlValue::Integer {
            value: i64::from(b),
        },
        Document::Int(value) => SqlValue::Integer { value },
        Document::String(value) => SqlValue::Text { value },
        nested @ (Document::Float(_) | Document::List(_) | Document::Map(_)) => SqlValue::Text {
            value: nested.to_json_string(),
        },
    }
}
