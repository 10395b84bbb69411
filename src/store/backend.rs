//! Storage backends
//!
//! The raw string key/value primitive the config store writes through.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::Result;

/// A durable string key/value store
///
/// Values are opaque JSON text. Implementations must be shareable with the
/// background persist worker.
pub trait StorageBackend: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (overwrite) a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// All stored keys, in no particular order
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-process backend
///
/// ## Concurrency:
/// - `entries`: RwLock (persist worker writes, engine thread reads)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
