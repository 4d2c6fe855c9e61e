use uuid::Uuid;

/// Key maps: rows of the `keymaps` table, schema versions 1 to 13.
pub mod keymap;

/// Legacy fingerprint gesture maps stored as JSON preferences, versions 0 to 2, and their
/// move into the `fingerprintmaps` table.
pub mod fingerprint;

/// Namespace for uids introduced by migrations.
const MIGRATION_UID_NAMESPACE: Uuid = Uuid::from_u128(0x3f6c_2a1e_8d4b_5c70_9e12_a4b6_c8d0_e2f4);

/// A uid that is a pure function of `seed`.
///
/// Steps that add a `uid` to records that never had one use this instead of a random uid, so
/// migrating the same record twice yields the same output.
#[must_use]
pub fn derive_uid(seed: &str) -> String {
    Uuid::new_v5(&MIGRATION_UID_NAMESPACE, seed.as_bytes()).to_string()
}
