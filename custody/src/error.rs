//! # Custody Errors
//!
//! One enum for everything a caller of [`crate::CustodyService`] can see.
//! Module-level errors (`KeyError`, `CodecError`, `LedgerError`, ...) stay
//! precise inside their modules and fold into [`CustodyError`] at the
//! service boundary.
//!
//! Validation and policy failures are the caller's fault and safe to show
//! them verbatim. Network, signing and storage failures are ours, and
//! carry enough context to debug without carrying key material.

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::crypto::keys::KeyError;
use crate::identity::address::AddressError;
use crate::ledger::LedgerError;
use crate::storage::StorageError;
use thiserror::Error;

pub type CustodyResult<T> = Result<T, CustodyError>;

#[derive(Debug, Error)]
pub enum CustodyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    /// Carries the rule that denied the transfer.
    #[error("policy violation: {reason}")]
    PolicyViolation { reason: String },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("ledger network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CustodyError {
    /// `true` for rejections caused by the request itself.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_)
                | Self::InvalidAmount(_)
                | Self::InvalidCurrency(_)
                | Self::PolicyViolation { .. }
                | Self::AccountNotFound(_)
                | Self::InvalidRequest(_)
        )
    }

    /// Short stable label, used for metrics and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidCurrency(_) => "invalid_currency",
            Self::PolicyViolation { .. } => "policy_violation",
            Self::KeyDerivation(_) => "key_derivation",
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::Signing(_) => "signing",
            Self::Encoding(_) => "encoding",
            Self::AccountNotFound(_) => "account_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
        }
    }

    pub(crate) fn policy(reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            reason: reason.into(),
        }
    }
}

impl From<KeyError> for CustodyError {
    fn from(err: KeyError) -> Self {
        Self::KeyDerivation(err.to_string())
    }
}

impl From<AddressError> for CustodyError {
    fn from(err: AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<CodecError> for CustodyError {
    fn from(err: CodecError) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<StorageError> for CustodyError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<ConfigError> for CustodyError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<LedgerError> for CustodyError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(address) => Self::AccountNotFound(address),
            other => Self::NetworkUnavailable(other.to_string()),
        }
    }
}
