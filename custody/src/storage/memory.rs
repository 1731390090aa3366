//! A [`SecretStore`] that forgets everything on drop.

use super::{immediate_children, Entry, SecretStore, StorageError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use zeroize::Zeroizing;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64, StorageError> {
        let value = Zeroizing::new(value);
        let mut entries = self.entries.write();
        let version = entries.get(key).map_or(0, |e| e.version) + 1;
        entries.insert(
            key.to_string(),
            Entry {
                key: key.to_string(),
                value,
                version,
            },
        );
        Ok(version)
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError> {
        let value = Zeroizing::new(value);
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                key: key.to_string(),
                value,
                version: 1,
            },
        );
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read();
        Ok(immediate_children(prefix, entries.keys().map(String::as_str)))
    }
}
