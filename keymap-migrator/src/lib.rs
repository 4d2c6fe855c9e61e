#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

//! `keymap_migrator` keeps Key Mapper's persisted configuration readable across app upgrades.
//!
//! Key maps live as rows of the `keymaps` table and legacy fingerprint gesture maps live as
//! JSON preference values. Every released schema version is reachable from every older one
//! through an ordered chain of migration steps, and this crate resolves and runs those chains
//! on behalf of the Android host.

/// Introduces low level primitives: logging, configuration and the host storage interfaces.
pub mod primitives;

/// The loosely typed tree every migration step reads and writes.
pub mod document;

/// The migration engine: steps, registries, chain resolution and the executors.
pub mod migration;

/// Record families and the per-version transforms that evolve them.
pub mod families;

pub use keymap_migrator_macros::{migrator_error, migrator_export};

uniffi::setup_scaffolding!("keymap_migrator");
