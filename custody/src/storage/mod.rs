//! # Secret Storage
//!
//! Custodied key material lives behind [`SecretStore`]: a versioned
//! key-value store with `get`, `put` and `list` by path. The custody core
//! decides *what* gets stored (an [`AccountRecord`] at `accounts/<name>`)
//! but never *how*; that is the backend's job.
//!
//! ```text
//! storage/
//!   memory.rs      MemoryStore, a HashMap behind a lock (tests, demos)
//!   sled_store.rs  SledStore, embedded on-disk store
//!   record.rs      the persisted JSON shape of an account
//! ```
//!
//! Paths are `/`-separated. `list("accounts/")` returns the immediate
//! children under that prefix; nested folders come back with a trailing
//! `/`, the way most secret stores present them.

pub mod memory;
pub mod record;
pub mod sled_store;

pub use memory::MemoryStore;
pub use record::AccountRecord;
pub use sled_store::SledStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt entry at {0}")]
    Corrupt(String),
}

/// A stored value and the version it was written at. Versions start at 1
/// and grow by one on every write to the same key.
///
/// Values hold serialized key material, so they are wiped on drop and left
/// out of `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Zeroizing<Vec<u8>>,
    pub version: u64,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Entry {
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        serde_json::from_slice(&self.value)
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", self.key)))
    }
}

/// Serialize into a buffer sized up front, so the payload is never copied
/// by a reallocation. Stores wipe the buffer once they have written it.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut out = Vec::with_capacity(ENCODE_CAPACITY);
    serde_json::to_writer(&mut out, value)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(out)
}

/// Comfortably above an account record with a few dozen list entries.
const ENCODE_CAPACITY: usize = 4096;

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Entry>, StorageError>;

    /// Write unconditionally. Returns the new version. Implementations wipe
    /// `value` once it has been stored.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64, StorageError>;

    /// Write only if nothing is stored at `key`. Returns `false`, and
    /// leaves the store untouched, when the key is taken.
    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError>;

    /// Immediate children of `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Reduce full keys under `prefix` to their immediate child names.
pub(crate) fn immediate_children<'a>(
    prefix: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let children: BTreeSet<String> = keys
        .into_iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .map(|rest| match rest.find('/') {
            Some(idx) => rest[..=idx].to_string(),
            None => rest.to_string(),
        })
        .collect();
    children.into_iter().collect()
}
