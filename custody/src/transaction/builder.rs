//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] enforces a disciplined construction flow:
//! pick the transaction type, set the fields that type needs, call
//! `.build()`, and get back an unsigned [`Transaction`] in the `Populated`
//! state with the canonical fee and an unassigned (zero) sequence.
//!
//! The builder does not fetch sequences and does not sign; that happens in
//! [`super::sequencer`] and [`super::signing`]. This separation keeps
//! construction testable without a network or key material.

use super::types::{Amount, Memo, TransactionState, TransactionType};
use crate::config::{MAX_DOMAIN_LENGTH, MAX_MEMO_LENGTH, MIN_TX_FEE_DROPS};
use crate::crypto::keys::PublicKey;
use crate::error::{CustodyError, CustodyResult};
use crate::identity::address::AccountId;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// The type-specific part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Payment {
        destination: AccountId,
        amount: Amount,
    },
    AccountSet {
        set_flag: Option<u32>,
        clear_flag: Option<u32>,
        domain: Option<Vec<u8>>,
    },
    TrustSet {
        limit_amount: Amount,
    },
}

/// An XRP Ledger transaction on its way through the signing pipeline.
///
/// Common fields live here; the rest is in [`TransactionKind`]. `sequence`
/// is 0 until the sequencer assigns it, `signing_pub_key` and `signature`
/// are `None` until the signer runs, and `hash` is computed from the signed
/// encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The source account.
    pub account: AccountId,

    /// Cost in drops.
    pub fee: u64,

    pub sequence: u32,

    pub flags: u32,

    pub kind: TransactionKind,

    pub memos: Vec<Memo>,

    pub signing_pub_key: Option<PublicKey>,

    /// DER-encoded ECDSA signature.
    pub signature: Option<Vec<u8>>,

    /// SHA-512Half of the `TXN\0`-prefixed signed encoding.
    pub hash: Option<[u8; 32]>,

    pub state: TransactionState,
}

impl Transaction {
    pub fn transaction_type(&self) -> TransactionType {
        match self.kind {
            TransactionKind::Payment { .. } => TransactionType::Payment,
            TransactionKind::AccountSet { .. } => TransactionType::AccountSet,
            TransactionKind::TrustSet { .. } => TransactionType::TrustSet,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Uppercase hex transaction id, once signed.
    pub fn hash_hex(&self) -> Option<String> {
        self.hash.map(hex::encode_upper)
    }

    /// Move to `Failed`. Terminal.
    pub fn fail(&mut self) {
        self.state = TransactionState::Failed;
    }

    /// Guard for pipeline stages: error unless in `expected`.
    pub(crate) fn require_state(
        &self,
        expected: TransactionState,
        err: fn(String) -> CustodyError,
    ) -> CustodyResult<()> {
        if self.state != expected {
            return Err(err(format!(
                "transaction is {} but must be {}",
                self.state, expected
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```
/// use xrpl_custody::identity::AccountId;
/// use xrpl_custody::transaction::{Amount, TransactionBuilder, TransactionType};
///
/// let source = AccountId::from_bytes([1; 20]);
/// let destination = AccountId::from_bytes([2; 20]);
/// let tx = TransactionBuilder::new(TransactionType::Payment, source)
///     .destination(destination)
///     .amount(Amount::Native(35))
///     .build()
///     .unwrap();
///
/// assert_eq!(tx.fee, 10);
/// assert_eq!(tx.sequence, 0);
/// ```
pub struct TransactionBuilder {
    tx_type: TransactionType,
    account: AccountId,
    destination: Option<AccountId>,
    amount: Option<Amount>,
    limit_amount: Option<Amount>,
    set_flag: Option<u32>,
    clear_flag: Option<u32>,
    domain: Option<Vec<u8>>,
    memos: Vec<Memo>,
}

impl TransactionBuilder {
    pub fn new(tx_type: TransactionType, account: AccountId) -> Self {
        Self {
            tx_type,
            account,
            destination: None,
            amount: None,
            limit_amount: None,
            set_flag: None,
            clear_flag: None,
            domain: None,
            memos: Vec::new(),
        }
    }

    pub fn destination(mut self, destination: AccountId) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn limit_amount(mut self, limit: Amount) -> Self {
        self.limit_amount = Some(limit);
        self
    }

    pub fn set_flag(mut self, flag: Option<u32>) -> Self {
        self.set_flag = flag;
        self
    }

    pub fn clear_flag(mut self, flag: Option<u32>) -> Self {
        self.clear_flag = flag;
        self
    }

    pub fn domain(mut self, domain: Option<Vec<u8>>) -> Self {
        self.domain = domain;
        self
    }

    pub fn memo(mut self, memo: Memo) -> Self {
        self.memos.push(memo);
        self
    }

    /// Check the fields the transaction type needs and produce an unsigned
    /// transaction carrying the canonical fee.
    pub fn build(self) -> CustodyResult<Transaction> {
        let kind = match self.tx_type {
            TransactionType::Payment => {
                let destination = self.destination.ok_or_else(|| missing("destination"))?;
                let amount = self.amount.ok_or_else(|| missing("amount"))?;
                TransactionKind::Payment {
                    destination,
                    amount,
                }
            }
            TransactionType::AccountSet => {
                if let Some(domain) = &self.domain {
                    if domain.len() > MAX_DOMAIN_LENGTH {
                        return Err(CustodyError::InvalidRequest(format!(
                            "domain exceeds {MAX_DOMAIN_LENGTH} bytes"
                        )));
                    }
                }
                TransactionKind::AccountSet {
                    set_flag: self.set_flag,
                    clear_flag: self.clear_flag,
                    domain: self.domain,
                }
            }
            TransactionType::TrustSet => {
                let limit_amount = self.limit_amount.ok_or_else(|| missing("limitAmount"))?;
                if limit_amount.is_native() {
                    return Err(CustodyError::InvalidCurrency(
                        "trust lines cannot be set for the native currency".into(),
                    ));
                }
                TransactionKind::TrustSet { limit_amount }
            }
        };

        let memo_bytes: usize = self.memos.iter().map(Memo::data_len).sum();
        if memo_bytes > MAX_MEMO_LENGTH {
            return Err(CustodyError::InvalidRequest(format!(
                "memos exceed {MAX_MEMO_LENGTH} bytes"
            )));
        }

        Ok(Transaction {
            account: self.account,
            fee: MIN_TX_FEE_DROPS,
            sequence: 0,
            flags: 0,
            kind,
            memos: self.memos,
            signing_pub_key: None,
            signature: None,
            hash: None,
            state: TransactionState::Populated,
        })
    }
}

fn missing(field: &str) -> CustodyError {
    CustodyError::InvalidRequest(format!("missing required field '{field}'"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::{Currency, IssuedValue};

    fn source() -> AccountId {
        AccountId::from_bytes([1; 20])
    }

    fn destination() -> AccountId {
        AccountId::from_bytes([2; 20])
    }

    fn usd_limit() -> Amount {
        Amount::Issued {
            value: IssuedValue::from_decimal("1000000").unwrap(),
            currency: Currency::parse_issued("USD").unwrap(),
            issuer: destination(),
        }
    }

    #[test]
    fn payment_gets_canonical_fee_and_no_sequence() {
        let tx = TransactionBuilder::new(TransactionType::Payment, source())
            .destination(destination())
            .amount(Amount::Native(35))
            .build()
            .unwrap();
        assert_eq!(tx.fee, MIN_TX_FEE_DROPS);
        assert_eq!(tx.sequence, 0);
        assert_eq!(tx.flags, 0);
        assert_eq!(tx.state, TransactionState::Populated);
        assert_eq!(tx.transaction_type(), TransactionType::Payment);
        assert!(!tx.is_signed());
        assert!(tx.hash_hex().is_none());
    }

    #[test]
    fn payment_requires_destination_and_amount() {
        let err = TransactionBuilder::new(TransactionType::Payment, source())
            .amount(Amount::Native(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, CustodyError::InvalidRequest(ref m) if m.contains("destination")));

        let err = TransactionBuilder::new(TransactionType::Payment, source())
            .destination(destination())
            .build()
            .unwrap_err();
        assert!(matches!(err, CustodyError::InvalidRequest(ref m) if m.contains("amount")));
    }

    #[test]
    fn empty_account_set_is_accepted() {
        let tx = TransactionBuilder::new(TransactionType::AccountSet, source())
            .build()
            .unwrap();
        assert_eq!(
            tx.kind,
            TransactionKind::AccountSet {
                set_flag: None,
                clear_flag: None,
                domain: None
            }
        );
    }

    #[test]
    fn account_set_rejects_oversized_domain() {
        let err = TransactionBuilder::new(TransactionType::AccountSet, source())
            .domain(Some(vec![b'a'; MAX_DOMAIN_LENGTH + 1]))
            .build()
            .unwrap_err();
        assert!(matches!(err, CustodyError::InvalidRequest(_)));
    }

    #[test]
    fn trust_set_requires_issued_limit() {
        let tx = TransactionBuilder::new(TransactionType::TrustSet, source())
            .limit_amount(usd_limit())
            .build()
            .unwrap();
        assert_eq!(tx.transaction_type(), TransactionType::TrustSet);

        let err = TransactionBuilder::new(TransactionType::TrustSet, source())
            .limit_amount(Amount::Native(5))
            .build()
            .unwrap_err();
        assert!(matches!(err, CustodyError::InvalidCurrency(_)));
    }

    fn payment_with_memo(text: &str) -> CustodyResult<Transaction> {
        TransactionBuilder::new(TransactionType::Payment, source())
            .destination(destination())
            .amount(Amount::Native(1))
            .memo(Memo::text(text))
            .build()
    }

    #[test]
    fn memo_limit_counts_only_the_data() {
        let tx = payment_with_memo(&"x".repeat(MAX_MEMO_LENGTH)).unwrap();
        assert_eq!(tx.memos[0].data_len(), MAX_MEMO_LENGTH);
        assert!(payment_with_memo(&"x".repeat(1020)).is_ok());
    }

    #[test]
    fn oversized_memo_is_rejected() {
        let err = payment_with_memo(&"x".repeat(MAX_MEMO_LENGTH + 1)).unwrap_err();
        assert!(matches!(err, CustodyError::InvalidRequest(_)));
    }

    #[test]
    fn require_state_guards_pipeline_order() {
        let mut tx = TransactionBuilder::new(TransactionType::AccountSet, source())
            .build()
            .unwrap();
        assert!(tx
            .require_state(TransactionState::Populated, CustodyError::Signing)
            .is_ok());
        let err = tx
            .require_state(TransactionState::SequenceAssigned, CustodyError::Signing)
            .unwrap_err();
        assert!(matches!(err, CustodyError::Signing(_)));

        tx.fail();
        assert_eq!(tx.state, TransactionState::Failed);
    }
}
