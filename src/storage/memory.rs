use std::collections::HashMap;

use parking_lot::Mutex;

use super::KeyValueStore;

/// In-process store used by tests and dry runs.
///
/// Every `set` is recorded, including ones dropped while the store is unavailable,
/// so callers can assert how often and with what a key was written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    unavailable: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an unavailable backend: reads return nothing, writes are dropped.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    pub fn writes_for(&self, key: &str) -> Vec<String> {
        self.writes
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        if *self.unavailable.lock() {
            tracing::error!(key, "error reading from local store: backend unavailable");
            return None;
        }
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.writes.lock().push((key.to_string(), value.to_string()));
        if *self.unavailable.lock() {
            tracing::error!(key, "error writing to local store: backend unavailable");
            return;
        }
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        if *self.unavailable.lock() {
            tracing::error!(key, "error removing from local store: backend unavailable");
            return;
        }
        self.values.lock().remove(key);
    }
}
