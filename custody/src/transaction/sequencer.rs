//! Per-account sequence assignment.
//!
//! The ledger accepts exactly one transaction per `(account, sequence)`, in
//! order. Two requests for the same account that both fetch sequence 41
//! and both sign will produce one success and one `tefPAST_SEQ`. So
//! fetch-then-sign is a critical section per account:
//!
//! ```text
//! acquire(account)  ──▶ SequenceLease (holds the account's mutex)
//!   assign_sequence ──▶ fetch from ledger, stamp tx          [lease pending]
//!   sign            ──▶ lease.mark_signed()                   [lease clean]
//!   (submit)
//! drop(lease)       ──▶ mutex released, map entry reaped if idle
//! ```
//!
//! Different accounts never contend: each gets its own mutex. Nothing is
//! cached; every assignment asks the ledger, which is the only authority on
//! what "next" means.

use super::builder::Transaction;
use super::types::TransactionState;
use crate::error::{CustodyError, CustodyResult};
use crate::identity::address::AccountId;
use crate::ledger::LedgerClient;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

type LockMap = DashMap<AccountId, Arc<Mutex<()>>>;

#[derive(Clone)]
pub struct Sequencer {
    ledger: Arc<dyn LedgerClient>,
    locks: Arc<LockMap>,
}

impl Sequencer {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Wait for exclusive use of `account`'s sequence. Cancel-safe: a
    /// future dropped while waiting takes nothing with it.
    pub async fn acquire(&self, account: AccountId) -> SequenceLease {
        let lock = self.locks.entry(account).or_default().clone();
        let guard = lock.lock_owned().await;
        debug!(account = %account, "sequence lease acquired");
        SequenceLease {
            account,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            pending: None,
        }
    }

    /// Fetch the account's current sequence and stamp it on `tx`.
    ///
    /// `tx` must be `Populated` and belong to the lease's account. A ledger
    /// failure leaves `tx` `Failed` and surfaces as `NetworkUnavailable`
    /// (or `AccountNotFound` when the ledger has no such account).
    pub async fn assign_sequence(
        &self,
        lease: &mut SequenceLease,
        tx: &mut Transaction,
    ) -> CustodyResult<u32> {
        if lease.account != tx.account {
            return Err(CustodyError::InvalidRequest(format!(
                "sequence lease for {} cannot sequence a transaction from {}",
                lease.account, tx.account
            )));
        }
        tx.require_state(TransactionState::Populated, CustodyError::InvalidRequest)?;

        let sequence = match self.ledger.fetch_sequence(&tx.account).await {
            Ok(sequence) => sequence,
            Err(e) => {
                tx.fail();
                return Err(e.into());
            }
        };

        tx.sequence = sequence;
        tx.state = TransactionState::SequenceAssigned;
        lease.pending = Some(sequence);
        debug!(account = %tx.account, sequence, "sequence assigned");
        Ok(sequence)
    }

    /// Accounts with a live or awaited lease.
    pub fn active_accounts(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive right to sequence transactions for one account. Released on
/// drop.
pub struct SequenceLease {
    account: AccountId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    pending: Option<u32>,
}

impl SequenceLease {
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// The sequence assigned under this lease and not yet signed.
    pub fn pending_sequence(&self) -> Option<u32> {
        self.pending
    }

    /// The transaction carrying the assigned sequence has been signed.
    pub fn mark_signed(&mut self) {
        self.pending = None;
    }

    pub fn release(self) {}
}

impl Drop for SequenceLease {
    fn drop(&mut self) {
        if let Some(sequence) = self.pending.take() {
            warn!(
                account = %self.account,
                sequence,
                "discarding assigned sequence; transaction was never signed"
            );
        }
        drop(self.guard.take());
        self.locks
            .remove_if(&self.account, |_, lock| Arc::strong_count(lock) == 1);
    }
}
