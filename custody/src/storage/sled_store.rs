//! On-disk [`SecretStore`] backed by sled.
//!
//! Everything lives in one tree, `secrets`. Each value is the entry's
//! version as a big-endian u64 followed by the payload:
//!
//! | Key           | Value                        |
//! |---------------|------------------------------|
//! | path (UTF-8)  | `version` (8B BE) ‖ payload  |
//!
//! sled is thread-safe and `Clone` is a cheap handle copy, so one
//! `SledStore` can be shared across every request.

use super::{immediate_children, Entry, SecretStore, StorageError};
use async_trait::async_trait;
use sled::{Db, IVec, Tree};
use std::path::Path;
use zeroize::Zeroizing;

const SECRETS_TREE: &str = "secrets";
const VERSION_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    secrets: Tree,
}

impl SledStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_db(sled::open(path)?)
    }

    /// A throwaway store, removed when dropped.
    pub fn open_temporary() -> Result<Self, StorageError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let secrets = db.open_tree(SECRETS_TREE)?;
        Ok(Self { db, secrets })
    }

    pub async fn flush(&self) -> Result<(), StorageError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

fn pack(version: u64, payload: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(VERSION_LEN + payload.len()));
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn unpack(key: &str, raw: &[u8]) -> Result<(u64, Zeroizing<Vec<u8>>), StorageError> {
    if raw.len() < VERSION_LEN {
        return Err(StorageError::Corrupt(key.to_string()));
    }
    let (version, payload) = raw.split_at(VERSION_LEN);
    let mut bytes = [0u8; VERSION_LEN];
    bytes.copy_from_slice(version);
    Ok((u64::from_be_bytes(bytes), Zeroizing::new(payload.to_vec())))
}

fn stored_version(raw: Option<&[u8]>) -> u64 {
    raw.filter(|r| r.len() >= VERSION_LEN)
        .map(|r| {
            let mut bytes = [0u8; VERSION_LEN];
            bytes.copy_from_slice(&r[..VERSION_LEN]);
            u64::from_be_bytes(bytes)
        })
        .unwrap_or(0)
}

#[async_trait]
impl SecretStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        let Some(raw) = self.secrets.get(key.as_bytes())? else {
            return Ok(None);
        };
        let (version, value) = unpack(key, &raw)?;
        Ok(Some(Entry {
            key: key.to_string(),
            value,
            version,
        }))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64, StorageError> {
        let value = Zeroizing::new(value);
        let updated = self.secrets.update_and_fetch(key.as_bytes(), |old| {
            Some(IVec::from(pack(stored_version(old) + 1, &value).as_slice()))
        })?;
        match updated {
            Some(raw) => Ok(unpack(key, &raw)?.0),
            None => Err(StorageError::Corrupt(key.to_string())),
        }
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError> {
        let packed = pack(1, &Zeroizing::new(value));
        let swapped = self.secrets.compare_and_swap(
            key.as_bytes(),
            None as Option<&[u8]>,
            Some(packed.as_slice()),
        )?;
        Ok(swapped.is_ok())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for item in self.secrets.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            match String::from_utf8(key.to_vec()) {
                Ok(key) => keys.push(key),
                Err(_) => return Err(StorageError::Corrupt(prefix.to_string())),
            }
        }
        Ok(immediate_children(prefix, keys.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn temporary_store_round_trip() {
        let store = SledStore::open_temporary().unwrap();
        assert_eq!(store.put("accounts/a", b"one".to_vec()).await.unwrap(), 1);
        assert_eq!(store.put("accounts/a", b"two".to_vec()).await.unwrap(), 2);

        let entry = store.get("accounts/a").await.unwrap().unwrap();
        assert_eq!(entry.value.as_slice(), b"two");
        assert_eq!(entry.version, 2);
    }

    #[tokio::test]
    async fn put_if_absent_respects_existing_keys() {
        let store = SledStore::open_temporary().unwrap();
        assert!(store.put_if_absent("k", b"first".to_vec()).await.unwrap());
        assert!(!store.put_if_absent("k", b"second".to_vec()).await.unwrap());
        let entry = store.get("k").await.unwrap().unwrap();
        assert_eq!(entry.value.as_slice(), b"first");
        assert_eq!(entry.version, 1);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.put("accounts/alice", b"{}".to_vec()).await.unwrap();
            store.put("accounts/bob", b"{}".to_vec()).await.unwrap();
            store.flush().await.unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(
            store.list("accounts/").await.unwrap(),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn short_values_are_corrupt() {
        assert!(matches!(
            unpack("k", &[1, 2, 3]),
            Err(StorageError::Corrupt(_))
        ));
    }
}
