use thiserror::Error;

/// Errors raised by the host preference store
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum PreferenceStoreError {
    /// The value could not be read
    #[error("failed to read value")]
    ReadFailure,
    /// The value could not be written or removed
    #[error("failed to update value")]
    UpdateFailure,
    /// An unexpected error occurred in the foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PreferenceStoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// String preferences persisted by the host (Jetpack `DataStore`).
///
/// Legacy fingerprint gesture maps are stored here as JSON under `swipe_down`, `swipe_up`,
/// `swipe_left` and `swipe_right`, and the migrator keeps its per-family run records under
/// `migration:{family}`.
#[uniffi::export(with_foreign)]
pub trait PreferenceStore: Send + Sync {
    /// Reads a value, `None` when the key is absent.
    ///
    /// # Errors
    /// - `PreferenceStoreError::ReadFailure` if the store cannot be read
    fn read_value(&self, key: String) -> Result<Option<String>, PreferenceStoreError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    /// - `PreferenceStoreError::UpdateFailure` if the value cannot be persisted
    fn write_value(&self, key: String, value: String) -> Result<(), PreferenceStoreError>;

    /// Removes a value. Removing an absent key succeeds.
    ///
    /// # Errors
    /// - `PreferenceStoreError::UpdateFailure` if the value cannot be removed
    fn remove_value(&self, key: String) -> Result<(), PreferenceStoreError>;
}

#[cfg(test)]
/// In-memory implementation of `PreferenceStore` for testing purposes
#[allow(dead_code)]
pub struct InMemoryPreferenceStore {
    store: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
#[allow(dead_code)]
impl InMemoryPreferenceStore {
    /// Creates a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Creates a store pre-filled with `entries`
    #[must_use]
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (key, value) in entries {
            store
                .store
                .lock()
                .unwrap()
                .insert((*key).to_string(), (*value).to_string());
        }
        store
    }

    /// Direct read without going through the trait
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
impl PreferenceStore for InMemoryPreferenceStore {
    fn read_value(&self, key: String) -> Result<Option<String>, PreferenceStoreError> {
        Ok(self.store.lock().unwrap().get(&key).cloned())
    }

    fn write_value(&self, key: String, value: String) -> Result<(), PreferenceStoreError> {
        self.store.lock().unwrap().insert(key, value);
        Ok(())
    }

    fn remove_value(&self, key: String) -> Result<(), PreferenceStoreError> {
        self.store.lock().unwrap().remove(&key);
        Ok(())
    }
}
