//! In-process ledger double.
//!
//! Behaves like a single, honest rippled node for the two calls we make:
//! sequences live in a map, a submitted blob is decoded, its signature
//! checked, and its sequence compared against the account's. Accepted
//! transactions bump the sequence; an accepted native payment to an unknown
//! destination creates that account, just like funding on the real ledger.
//!
//! Optional latency on `fetch_sequence` and an in-flight counter let tests
//! observe whether calls for one account ever overlap.

use super::{LedgerClient, LedgerError, SubmitResult};
use crate::codec;
use crate::identity::address::AccountId;
use crate::transaction::builder::{Transaction, TransactionKind};
use crate::transaction::signing::verify_transaction_signature;
use crate::transaction::types::Amount;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Sequence given to accounts the ledger creates on first funding.
pub const DEFAULT_STARTING_SEQUENCE: u32 = 1;

#[derive(Default)]
pub struct InMemoryLedger {
    sequences: Mutex<HashMap<AccountId, u32>>,
    accepted: Mutex<Vec<Transaction>>,
    latency: Option<Duration>,
    offline: AtomicBool,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `fetch_sequence` sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `account` exist with the given next sequence.
    pub fn fund(&self, account: AccountId, sequence: u32) {
        self.sequences.lock().insert(account, sequence);
    }

    pub fn sequence_of(&self, account: &AccountId) -> Option<u32> {
        self.sequences.lock().get(account).copied()
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Transactions accepted so far, in submission order.
    pub fn accepted(&self) -> Vec<Transaction> {
        self.accepted.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of `fetch_sequence` calls seen running at once.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("ledger is offline".into()));
        }
        Ok(())
    }

    fn apply(&self, tx: Transaction) -> SubmitResult {
        let mut sequences = self.sequences.lock();
        let Some(expected) = sequences.get(&tx.account).copied() else {
            return result("terNO_ACCOUNT", -96, "The source account does not exist.");
        };
        if tx.sequence < expected {
            return result("tefPAST_SEQ", -190, "This sequence number has already passed.");
        }
        if tx.sequence > expected {
            return result("terPRE_SEQ", -92, "Missing/inapplicable prior transaction.");
        }

        sequences.insert(tx.account, expected + 1);
        if let TransactionKind::Payment {
            destination,
            amount: Amount::Native(_),
        } = tx.kind
        {
            sequences
                .entry(destination)
                .or_insert(DEFAULT_STARTING_SEQUENCE);
        }
        drop(sequences);

        self.accepted.lock().push(tx);
        result(
            "tesSUCCESS",
            0,
            "The transaction was applied. Only final in a validated ledger.",
        )
    }
}

fn result(engine_result: &str, code: i32, message: &str) -> SubmitResult {
    SubmitResult {
        engine_result: engine_result.to_string(),
        engine_result_code: code,
        engine_result_message: message.to_string(),
    }
}

/// Decrements the in-flight counter however the fetch ends.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn fetch_sequence(&self, account: &AccountId) -> Result<u32, LedgerError> {
        self.check_online()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.sequence_of(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.to_address()))
    }

    async fn submit(&self, tx_blob: &[u8]) -> Result<SubmitResult, LedgerError> {
        self.check_online()?;
        let tx = match codec::decode(tx_blob) {
            Ok(tx) => tx,
            Err(e) => return Ok(result("temMALFORMED", -299, &e.to_string())),
        };
        if !verify_transaction_signature(&tx) {
            return Ok(result("temBAD_SIGNATURE", -281, "The signature is invalid."));
        }
        Ok(self.apply(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::account::{derive, Account};
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::signing::sign_transaction;
    use crate::transaction::types::{TransactionState, TransactionType};

    fn signed_payment(from: &Account, to: AccountId, sequence: u32) -> Vec<u8> {
        let mut tx = TransactionBuilder::new(TransactionType::Payment, from.id())
            .destination(to)
            .amount(Amount::Native(1_000))
            .build()
            .unwrap();
        tx.sequence = sequence;
        tx.state = TransactionState::SequenceAssigned;
        sign_transaction(&mut tx, from).unwrap();
        codec::encode(&tx).unwrap().raw
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let ledger = InMemoryLedger::new();
        let err = ledger
            .fetch_sequence(&AccountId::from_bytes([1; 20]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn accepted_payment_advances_sequence_and_creates_destination() {
        let ledger = InMemoryLedger::new();
        let alice = derive(&[1; 16]).unwrap();
        let bob = derive(&[2; 16]).unwrap();
        ledger.fund(alice.id(), 7);

        let outcome = ledger.submit(&signed_payment(&alice, bob.id(), 7)).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(ledger.fetch_sequence(&alice.id()).await.unwrap(), 8);
        assert_eq!(
            ledger.sequence_of(&bob.id()),
            Some(DEFAULT_STARTING_SEQUENCE)
        );
        assert_eq!(ledger.accepted().len(), 1);
    }

    #[tokio::test]
    async fn stale_and_future_sequences_are_rejected() {
        let ledger = InMemoryLedger::new();
        let alice = derive(&[1; 16]).unwrap();
        let bob = AccountId::from_bytes([9; 20]);
        ledger.fund(alice.id(), 7);

        let past = ledger.submit(&signed_payment(&alice, bob, 6)).await.unwrap();
        assert_eq!(past.engine_result, "tefPAST_SEQ");
        let future = ledger.submit(&signed_payment(&alice, bob, 9)).await.unwrap();
        assert_eq!(future.engine_result, "terPRE_SEQ");
        assert_eq!(ledger.sequence_of(&alice.id()), Some(7));
    }

    #[tokio::test]
    async fn tampered_blob_fails_signature_check() {
        let ledger = InMemoryLedger::new();
        let alice = derive(&[1; 16]).unwrap();
        ledger.fund(alice.id(), 1);

        let mut blob = signed_payment(&alice, AccountId::from_bytes([9; 20]), 1);
        // Last byte of the destination account id.
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        let outcome = ledger.submit(&blob).await.unwrap();
        assert_eq!(outcome.engine_result, "temBAD_SIGNATURE");
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let ledger = InMemoryLedger::new();
        let outcome = ledger.submit(&[0xFF, 0x00]).await.unwrap();
        assert_eq!(outcome.engine_result, "temMALFORMED");
    }

    #[tokio::test]
    async fn offline_ledger_fails_both_calls() {
        let ledger = InMemoryLedger::new();
        ledger.set_offline(true);
        assert!(matches!(
            ledger.fetch_sequence(&AccountId::from_bytes([1; 20])).await,
            Err(LedgerError::Transport(_))
        ));
        assert!(matches!(
            ledger.submit(&[]).await,
            Err(LedgerError::Transport(_))
        ));
    }
}
