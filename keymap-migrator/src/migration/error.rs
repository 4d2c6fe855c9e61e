use crate::document::DocumentError;
use crate::primitives::{database::DatabaseError, preferences::PreferenceStoreError};

/// Errors that abort a migration run
#[crate::migrator_error]
pub enum MigrationError {
    /// The stored data was written by a newer app build
    #[error("cannot migrate {family} from version {stored} down to {target}")]
    DowngradeUnsupported {
        /// Record family
        family: String,
        /// Version found in storage
        stored: u32,
        /// Version this build expects
        target: u32,
    },

    /// No registered step starts at `at_version`
    #[error("no {family} migration from version {at_version} towards {target}")]
    NoMigrationPathFound {
        /// Record family
        family: String,
        /// Version the chain got stuck at
        at_version: u32,
        /// Requested target version
        target: u32,
    },

    /// The step list violates the registry invariants
    #[error("invalid {family} registry: {message}")]
    InvalidRegistry {
        /// Record family
        family: String,
        /// What is wrong
        message: String,
    },

    /// A table row could not be decoded, transformed or encoded
    #[error("row {row_id} of `{table}` failed at version {version_before} on `{field}`: {message}")]
    RowTransformFailure {
        /// Table the row was read from
        table: String,
        /// Primary key of the row
        row_id: i64,
        /// Version the failing step starts from
        version_before: u32,
        /// Offending field, empty when the whole row is affected
        field: String,
        /// Failure description
        message: String,
    },

    /// A single document could not be transformed
    #[error("{family} document failed at version {version_before} on `{field}`: {message}")]
    DocumentTransformFailure {
        /// Record family
        family: String,
        /// Version the failing step starts from
        version_before: u32,
        /// Offending field, empty when the whole document is affected
        field: String,
        /// Failure description
        message: String,
    },

    /// A backup was exported by a newer app build
    #[error("backup version {backup_version} is newer than supported version {supported}")]
    BackupVersionTooNew {
        /// Version recorded in the backup
        backup_version: u32,
        /// Newest version this build can read
        supported: u32,
    },

    /// An invalid operation was attempted
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The host database failed
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The host preference store failed
    #[error(transparent)]
    PreferenceStore(#[from] PreferenceStoreError),

    /// A record read outside any step is missing a field or holds the wrong kind of value
    #[error("invalid document at `{field}`: {message}")]
    InvalidDocument {
        /// Offending field
        field: String,
        /// Failure description
        message: String,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {message}")]
    JsonError {
        /// The error message from serde_json
        message: String,
    },
}

impl From<serde_json::Error> for MigrationError {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonError {
            message: e.to_string(),
        }
    }
}

impl From<DocumentError> for MigrationError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::InvalidJson { message } => Self::JsonError { message },
            other => Self::InvalidDocument {
                field: other.field().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl MigrationError {
    /// Stable code recorded in run records and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DowngradeUnsupported { .. } => "DOWNGRADE_UNSUPPORTED",
            Self::NoMigrationPathFound { .. } => "NO_MIGRATION_PATH",
            Self::InvalidRegistry { .. } => "INVALID_REGISTRY",
            Self::RowTransformFailure { .. } => "ROW_TRANSFORM_FAILURE",
            Self::DocumentTransformFailure { .. } => "DOCUMENT_TRANSFORM_FAILURE",
            Self::BackupVersionTooNew { .. } => "BACKUP_VERSION_TOO_NEW",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::Database(_) => "DATABASE",
            Self::PreferenceStore(_) => "PREFERENCE_STORE",
            Self::InvalidDocument { .. } => "INVALID_DOCUMENT",
            Self::JsonError { .. } => "JSON",
            Self::Generic { .. } => "GENERIC",
        }
    }
}

/// Result type for migration operations
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;
