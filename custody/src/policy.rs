//! # Transfer Policy
//!
//! Three rules, checked in this order, first failure wins:
//!
//! 1. **Spend limit.** A non-zero `spend_limit` caps each transfer. `0`
//!    means no cap, not "nothing allowed".
//! 2. **Blacklist.** A blacklisted counterparty is refused, for any amount,
//!    zero included.
//! 3. **Whitelist.** A non-empty whitelist is exhaustive.
//!
//! The check is pure, cheap, and runs before the ledger is ever contacted,
//! so a refused transfer never costs a network round trip or a signature.
//! It only applies to payments; trust lines and account settings move no
//! value.

use crate::error::{CustodyError, CustodyResult};
use crate::identity::account::Account;
use num_bigint::BigUint;
use serde::Serialize;

pub const REASON_SPEND_LIMIT: &str = "amount exceeds transactional limit";
pub const REASON_BLACKLISTED: &str = "counterparty is blacklisted";
pub const REASON_NOT_WHITELISTED: &str = "counterparty not in whitelist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// `Ok` when allowed, `PolicyViolation` carrying the reason otherwise.
    pub fn into_result(self) -> CustodyResult<()> {
        if self.allowed {
            return Ok(());
        }
        Err(CustodyError::policy(
            self.reason.unwrap_or_else(|| "denied".to_string()),
        ))
    }
}

/// Decide whether `account` may send `amount` to `counterparty`.
///
/// `amount` is in the asset's smallest integral unit (drops for XRP) and
/// `counterparty` is the destination's `r...` address.
pub fn authorize(account: &Account, amount: &BigUint, counterparty: &str) -> PolicyDecision {
    if account.spend_limit > 0 && *amount > BigUint::from(account.spend_limit) {
        return PolicyDecision::deny(REASON_SPEND_LIMIT);
    }
    if account.blacklist.contains(counterparty) {
        return PolicyDecision::deny(REASON_BLACKLISTED);
    }
    if !account.whitelist.is_empty() && !account.whitelist.contains(counterparty) {
        return PolicyDecision::deny(REASON_NOT_WHITELISTED);
    }
    PolicyDecision::allow()
}
