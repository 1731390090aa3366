//! # Ledger Network Client
//!
//! The custody core needs exactly two things from the XRP Ledger: the
//! account's current sequence number, and a place to drop a signed blob.
//! [`LedgerClient`] is that seam.
//!
//! ```text
//! ledger/
//!   rpc.rs      JSON-RPC client for a rippled node (reqwest)
//!   faucet.rs   test-network faucet, for funding fresh accounts
//!   memory.rs   deterministic in-process double for tests and demos
//! ```
//!
//! Retries are not our problem. A client either answers or fails, and the
//! failure surfaces as `NetworkUnavailable` to whoever asked.

pub mod faucet;
pub mod memory;
pub mod rpc;

pub use faucet::{FaucetAccount, FaucetClient};
pub use memory::InMemoryLedger;
pub use rpc::JsonRpcLedgerClient;

use crate::identity::address::AccountId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("rpc error: {0}")]
    Rpc(String),

    /// The ledger has never heard of this address.
    #[error("account {0} not found on ledger")]
    AccountNotFound(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("faucet error: {0}")]
    Faucet(String),
}

/// What the ledger said about a submitted blob.
///
/// Submission is asynchronous on the ledger side: `tesSUCCESS` here means
/// the transaction was applied provisionally, not that it is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub engine_result: String,
    pub engine_result_code: i32,
    pub engine_result_message: String,
}

impl SubmitResult {
    pub fn is_success(&self) -> bool {
        self.engine_result == "tesSUCCESS"
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The sequence the next transaction from `account` must carry.
    async fn fetch_sequence(&self, account: &AccountId) -> Result<u32, LedgerError>;

    /// Hand a signed, canonically encoded transaction to the network.
    async fn submit(&self, tx_blob: &[u8]) -> Result<SubmitResult, LedgerError>;
}
