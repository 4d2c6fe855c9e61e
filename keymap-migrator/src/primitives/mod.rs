/// Logging that forwards to the host's logger.
pub mod logger;

/// Process-wide migration settings.
pub mod config;

/// Host-provided relational storage used by the bulk table path.
pub mod database;

/// Host-provided key-value preference storage used by the lazy document path.
pub mod preferences;
