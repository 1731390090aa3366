//! # Account Ids & Ledger Addresses
//!
//! An account id is the 160-bit hash of a compressed public key; its
//! human-facing form is the `r...` address:
//!
//! ```text
//! public_key (33 bytes, compressed)
//!     -> RIPEMD160(SHA256(public_key)) -> 20 bytes
//!     -> base58check(version 0x00, ripple alphabet) -> rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh
//! ```
//!
//! The checksum catches the typos people make when pasting addresses into
//! payment forms, so every address that enters the system is parsed through
//! [`AccountId::from_address`] before anything else happens.

use crate::config::{ACCOUNT_ID_LENGTH, VERSION_ACCOUNT_ID};
use crate::crypto::base58::{self, Base58Error};
use crate::crypto::hash::account_id_hash;
use crate::crypto::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing a ledger address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("malformed address '{address}': {source}")]
    Malformed {
        address: String,
        #[source]
        source: Base58Error,
    },
}

/// A 20-byte ledger account id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; ACCOUNT_ID_LENGTH]);

impl AccountId {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(account_id_hash(public_key.as_bytes()))
    }

    pub const fn from_bytes(bytes: [u8; ACCOUNT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LENGTH] {
        &self.0
    }

    /// The `r...` form.
    pub fn to_address(&self) -> String {
        base58::encode_check(VERSION_ACCOUNT_ID, &self.0)
    }

    /// Parse an `r...` address, verifying version byte, length and checksum.
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let payload = base58::decode_check(trimmed, VERSION_ACCOUNT_ID, ACCOUNT_ID_LENGTH)
            .map_err(|source| AddressError::Malformed {
                address: trimmed.to_string(),
                source,
            })?;
        let mut bytes = [0u8; ACCOUNT_ID_LENGTH];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

impl FromStr for AccountId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_address(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_address())
    }
}

impl Serialize for AccountId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_address())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_address(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
