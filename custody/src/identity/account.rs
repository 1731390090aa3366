//! # Custodied Accounts
//!
//! An [`Account`] bundles a ledger identity with the key material we hold on
//! its owner's behalf and the transfer policy attached to it. It is created
//! exactly once, by [`derive`], and from then on only ever rematerialized
//! from storage for the duration of a single request.
//!
//! The key fields are private and typed: `PrivateKey` and `SecretString`
//! cannot be printed, cloned, or serialized, so an `Account` cannot be
//! either. What callers get to see is an [`AccountView`].

use crate::crypto::keys::{FamilySeed, KeyError, KeyPair, PrivateKey, PublicKey};
use crate::crypto::secret::SecretString;
use crate::identity::address::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Derive a fresh account from 16 bytes of caller-supplied entropy.
///
/// Pure and deterministic: the same seed always yields the same id, public
/// key, and private key. Policy fields start out permissive (`spend_limit`
/// 0, both lists empty).
pub fn derive(seed: &[u8]) -> Result<Account, KeyError> {
    let seed = FamilySeed::from_entropy(seed)?;
    Account::from_seed(&seed)
}

pub struct Account {
    id: AccountId,
    public_key: PublicKey,
    private_key: PrivateKey,
    secret: SecretString,
    /// Per-transaction ceiling; `0` means unlimited.
    pub spend_limit: u64,
    pub whitelist: BTreeSet<String>,
    pub blacklist: BTreeSet<String>,
}

impl Account {
    pub fn from_seed(seed: &FamilySeed) -> Result<Self, KeyError> {
        let (private_key, public_key) = seed.derive_keypair()?.into_parts();
        Ok(Self {
            id: AccountId::from_public_key(&public_key),
            public_key,
            private_key,
            secret: seed.encode(),
            spend_limit: 0,
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
        })
    }

    /// Rebuild an account from its recoverable `s...` secret alone.
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        Self::from_seed(&FamilySeed::from_encoded(secret)?)
    }

    /// Rebuild an account from stored key material, refusing anything that
    /// is not derivable from `secret`.
    pub fn from_stored(
        id: &str,
        public_key: &str,
        private_key: &str,
        secret: &str,
    ) -> Result<Self, KeyError> {
        let account = Self::from_secret(secret)?;
        if account.id.to_address() != id {
            return Err(KeyError::KeypairMismatch("account id"));
        }
        if !account.public_key.to_hex().eq_ignore_ascii_case(public_key) {
            return Err(KeyError::KeypairMismatch("public key"));
        }
        let stored = PrivateKey::from_hex(private_key)?;
        if stored.public_key()? != account.public_key {
            return Err(KeyError::KeypairMismatch("private key"));
        }
        Ok(account)
    }

    pub fn with_policy(
        mut self,
        spend_limit: u64,
        whitelist: impl IntoIterator<Item = String>,
        blacklist: impl IntoIterator<Item = String>,
    ) -> Self {
        self.spend_limit = spend_limit;
        self.whitelist = whitelist.into_iter().collect();
        self.blacklist = blacklist.into_iter().collect();
        self
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn address(&self) -> String {
        self.id.to_address()
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Re-derive a transient key pair for signing. Dropping it wipes it.
    pub fn keypair(&self) -> Result<KeyPair, KeyError> {
        let keypair = FamilySeed::from_encoded(self.secret.expose_secret())?.derive_keypair()?;
        if keypair.public_key() != self.public_key {
            return Err(KeyError::KeypairMismatch("public key"));
        }
        Ok(keypair)
    }

    /// Everything about the account that is safe to hand to a caller.
    pub fn view(&self) -> AccountView {
        AccountView {
            account_id: self.address(),
            public_key: self.public_key.to_hex(),
            spend_limit: self.spend_limit,
            whitelist: self.whitelist.clone(),
            blacklist: self.blacklist.clone(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("public_key", &self.public_key)
            .field("spend_limit", &self.spend_limit)
            .field("whitelist", &self.whitelist)
            .field("blacklist", &self.blacklist)
            .finish_non_exhaustive()
    }
}

/// The public face of an account. Never carries key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub account_id: String,
    pub public_key: String,
    pub spend_limit: u64,
    pub whitelist: BTreeSet<String>,
    pub blacklist: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_SECRET: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";

    #[test]
    fn derive_is_deterministic() {
        let seed = [0xA5u8; 16];
        let a = derive(&seed).unwrap();
        let b = derive(&seed).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(
            a.private_key().to_hex().expose_secret(),
            b.private_key().to_hex().expose_secret()
        );
        assert_eq!(a.secret().expose_secret(), b.secret().expose_secret());
    }

    #[test]
    fn derive_rejects_short_seed() {
        assert!(matches!(
            derive(&[1u8; 8]),
            Err(KeyError::InvalidSeedLength(8))
        ));
    }

    #[test]
    fn derived_account_has_permissive_defaults() {
        let account = derive(&[3u8; 16]).unwrap();
        assert_eq!(account.spend_limit, 0);
        assert!(account.whitelist.is_empty());
        assert!(account.blacklist.is_empty());
        assert!(account.address().starts_with('r'));
    }

    #[test]
    fn genesis_secret_yields_genesis_address() {
        let account = Account::from_secret(GENESIS_SECRET).unwrap();
        assert_eq!(account.address(), "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
    }

    #[test]
    fn keypair_matches_account() {
        let account = derive(&[9u8; 16]).unwrap();
        let keypair = account.keypair().unwrap();
        assert_eq!(keypair.public_key(), account.public_key());
        assert_eq!(AccountId::from_public_key(&keypair.public_key()), account.id());
    }

    #[test]
    fn from_stored_accepts_consistent_material() {
        let account = derive(&[4u8; 16]).unwrap();
        let restored = Account::from_stored(
            &account.address(),
            &account.public_key().to_hex(),
            account.private_key().to_hex().expose_secret(),
            account.secret().expose_secret(),
        )
        .unwrap();
        assert_eq!(restored.id(), account.id());
    }

    #[test]
    fn from_stored_rejects_foreign_id() {
        let account = derive(&[4u8; 16]).unwrap();
        let other = derive(&[5u8; 16]).unwrap();
        let err = Account::from_stored(
            &other.address(),
            &account.public_key().to_hex(),
            account.private_key().to_hex().expose_secret(),
            account.secret().expose_secret(),
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::KeypairMismatch("account id")));
    }

    #[test]
    fn from_stored_rejects_foreign_private_key() {
        let account = derive(&[4u8; 16]).unwrap();
        let other = derive(&[5u8; 16]).unwrap();
        let err = Account::from_stored(
            &account.address(),
            &account.public_key().to_hex(),
            other.private_key().to_hex().expose_secret(),
            account.secret().expose_secret(),
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::KeypairMismatch("private key")));
    }

    #[test]
    fn view_and_debug_never_expose_secrets() {
        let account = Account::from_secret(GENESIS_SECRET)
            .unwrap()
            .with_policy(1000, vec!["rA".to_string()], vec![]);
        let view = account.view();
        assert_eq!(view.spend_limit, 1000);
        assert_eq!(view.account_id, "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"accountId\""));
        assert!(json.contains("\"spendLimit\":1000"));
        assert!(!json.contains(GENESIS_SECRET));

        let debug = format!("{:?}", account);
        assert!(!debug.contains(GENESIS_SECRET));
        assert!(!debug.contains(account.private_key().to_hex().expose_secret()));
    }
}
