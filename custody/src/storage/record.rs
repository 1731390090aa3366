//! The persisted shape of a custodied account.
//!
//! ```json
//! {
//!   "id": "r...",
//!   "publicKey": "03...",
//!   "privateKey": "...",
//!   "secret": "s...",
//!   "spendLimit": 1000,
//!   "whitelist": ["r..."],
//!   "blacklist": []
//! }
//! ```
//!
//! This is the only place key material is serialized. Loading a record
//! re-derives everything from `secret` and refuses records whose stored
//! keys disagree with it.

use crate::crypto::keys::KeyError;
use crate::crypto::secret::{serde_exposed, SecretString};
use crate::identity::account::Account;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    #[serde(alias = "account_id")]
    pub id: String,
    #[serde(alias = "public_key")]
    pub public_key: String,
    #[serde(with = "serde_exposed", alias = "private_key")]
    pub private_key: SecretString,
    #[serde(with = "serde_exposed")]
    pub secret: SecretString,
    #[serde(default)]
    pub spend_limit: u64,
    #[serde(default)]
    pub whitelist: BTreeSet<String>,
    #[serde(default)]
    pub blacklist: BTreeSet<String>,
}

impl AccountRecord {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.address(),
            public_key: account.public_key().to_hex(),
            private_key: account.private_key().to_hex(),
            secret: SecretString::new(account.secret().expose_secret().to_string()),
            spend_limit: account.spend_limit,
            whitelist: account.whitelist.clone(),
            blacklist: account.blacklist.clone(),
        }
    }

    /// Rematerialize the account, checking the keys against the secret.
    pub fn into_account(self) -> Result<Account, KeyError> {
        let account = Account::from_stored(
            &self.id,
            &self.public_key,
            self.private_key.expose_secret(),
            self.secret.expose_secret(),
        )?;
        Ok(account.with_policy(self.spend_limit, self.whitelist, self.blacklist))
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("public_key", &self.public_key)
            .field("spend_limit", &self.spend_limit)
            .finish_non_exhaustive()
    }
}
