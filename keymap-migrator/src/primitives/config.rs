use std::sync::OnceLock;

use crate::migrator_export;

static CONFIG_INSTANCE: OnceLock<MigratorConfig> = OnceLock::new();

/// Rows fetched per `read_rows` call when no config has been installed.
pub const DEFAULT_ROW_BATCH_SIZE: u32 = 200;

/// Process-wide settings for the table executor.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Object)]
pub struct MigratorConfig {
    row_batch_size: u32,
    parallel_row_transforms: bool,
}

#[migrator_export]
impl MigratorConfig {
    /// Creates a config.
    ///
    /// `row_batch_size` bounds how many rows are held in memory per read; zero is treated as one.
    ///
    /// ## Kotlin
    ///
    /// ```kotlin
    /// val config = MigratorConfig(rowBatchSize = 500u, parallelRowTransforms = true)
    /// ```
    #[uniffi::constructor]
    #[must_use]
    pub fn new(row_batch_size: u32, parallel_row_transforms: bool) -> Self {
        Self {
            row_batch_size: row_batch_size.max(1),
            parallel_row_transforms,
        }
    }

    /// Rows fetched per read.
    #[must_use]
    pub fn row_batch_size(&self) -> u32 {
        self.row_batch_size
    }

    /// Whether per-row transforms of one step run on the rayon pool.
    #[must_use]
    pub fn parallel_row_transforms(&self) -> bool {
        self.parallel_row_transforms
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_BATCH_SIZE, true)
    }
}

/// Installs the global config. Call once before the first migration run.
///
/// Later calls are ignored with a warning.
///
/// ```kotlin
/// initMigratorConfig(rowBatchSize = 500u, parallelRowTransforms = false)
/// ```
#[uniffi::export]
pub fn init_migrator_config(row_batch_size: u32, parallel_row_transforms: bool) {
    let config = MigratorConfig::new(row_batch_size, parallel_row_transforms);

    match CONFIG_INSTANCE.set(config) {
        Ok(()) => {
            crate::info!(
                "config.initialized row_batch_size={} parallel_row_transforms={}",
                row_batch_size.max(1),
                parallel_row_transforms
            );
        }
        Err(_) => {
            crate::warn!("config.already_initialized ignoring");
        }
    }
}

/// The installed config, or the defaults when none was installed.
#[must_use]
pub fn current_config() -> MigratorConfig {
    CONFIG_INSTANCE.get().cloned().unwrap_or_default()
}

/// Checks if the global config has been installed.
#[must_use]
pub fn is_initialized() -> bool {
    CONFIG_INSTANCE.get().is_some()
}
