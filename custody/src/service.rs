//! # Custody Service
//!
//! The facade the routing layer talks to. It owns nothing but handles:
//! a [`SecretStore`] for accounts, a [`Sequencer`] wrapping the ledger
//! client, and optionally a faucet. Each call rematerializes the accounts
//! it needs from storage and drops them when it returns.
//!
//! ```text
//! sign(request)
//!   validate ─▶ load accounts ─▶ policy ─▶ build
//!     ─▶ acquire lease ─▶ assign sequence ─▶ sign ─▶ encode ─▶ (submit)
//!     ─▶ release lease
//! ```
//!
//! Policy runs before the lease is taken, so a refused payment never
//! touches the ledger.

use crate::codec::{self, EncodedTransaction};
use crate::config::{CustodyConfig, ACCOUNTS_PREFIX, NATIVE_CURRENCY};
use crate::crypto::keys::FamilySeed;
use crate::error::{CustodyError, CustodyResult};
use crate::identity::account::{Account, AccountView};
use crate::identity::address::AccountId;
use crate::ledger::{FaucetClient, JsonRpcLedgerClient, LedgerClient, SubmitResult};
use crate::policy;
use crate::storage::{encode_json, AccountRecord, SecretStore, SledStore};
use crate::transaction::{
    sign_transaction, Amount, Destination, PaymentRequest, SignRequest, Sequencer, Transaction,
    TransactionBuilder, TransactionState, TransactionType, ValidatedRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAccountRequest {
    /// Per-transaction cap in the smallest unit; `0` is unlimited.
    #[serde(default)]
    pub spend_limit: u64,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Drops to pay into the new account from `funding_account`.
    #[serde(default)]
    pub starting_balance: Option<String>,
    /// Name of the custody account that pays `starting_balance`.
    #[serde(default)]
    pub funding_account: Option<String>,
}

/// What a caller gets back for a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub source_address: String,
    pub transaction_type: TransactionType,
    pub sequence: u32,
    /// In drops.
    pub fee: u64,
    pub transaction_hash: String,
    /// Uppercase hex, ready for `submit`.
    pub signed_transaction_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    #[serde(flatten)]
    pub signed: SignedTransaction,
    pub submission: SubmitResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub transaction_hash: Option<String>,
    #[serde(flatten)]
    pub result: SubmitResult,
}

// ---------------------------------------------------------------------------
// CustodyService
// ---------------------------------------------------------------------------

pub struct CustodyService {
    store: Arc<dyn SecretStore>,
    sequencer: Sequencer,
    faucet: Option<Arc<FaucetClient>>,
    faucet_funding_drops: u64,
}

impl CustodyService {
    pub fn new(store: Arc<dyn SecretStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            store,
            sequencer: Sequencer::new(ledger),
            faucet: None,
            faucet_funding_drops: 0,
        }
    }

    /// Fund every new account with `drops` from a faucet-issued account.
    pub fn with_faucet(mut self, faucet: FaucetClient, drops: u64) -> Self {
        self.faucet = Some(Arc::new(faucet));
        self.faucet_funding_drops = drops;
        self
    }

    /// Production wiring: sled store under the data dir, JSON-RPC ledger
    /// client, faucet when the network has one and funding is enabled.
    pub fn from_config(config: &CustodyConfig) -> CustodyResult<Self> {
        let store = SledStore::open(config.store_path())?;
        let ledger = JsonRpcLedgerClient::new(config.rpc_endpoint(), config.request_timeout())?;
        let mut service = Self::new(Arc::new(store), Arc::new(ledger));
        if let Some(url) = config.faucet_endpoint() {
            let faucet = FaucetClient::new(url, config.request_timeout())?;
            service = service.with_faucet(faucet, config.funding.amount_drops);
        }
        Ok(service)
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        self.sequencer.ledger()
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Derive a new account, store it under `name`, and fund it.
    ///
    /// The account is stored before funding. If funding fails the error is
    /// returned and the account stays.
    pub async fn create_account(
        &self,
        name: &str,
        request: CreateAccountRequest,
    ) -> CustodyResult<AccountView> {
        validate_account_name(name)?;
        let funding = match (&request.starting_balance, &request.funding_account) {
            (Some(balance), Some(funder)) => Some((balance.clone(), funder.clone())),
            (None, None) => None,
            _ => {
                return Err(CustodyError::InvalidRequest(
                    "'startingBalance' and 'fundingAccount' must be given together".into(),
                ))
            }
        };

        let seed = FamilySeed::generate()?;
        let account = Account::from_seed(&seed)?.with_policy(
            request.spend_limit,
            clean_list(request.whitelist),
            clean_list(request.blacklist),
        );

        let record = encode_json(&AccountRecord::from_account(&account))?;
        if !self.store.put_if_absent(&account_key(name), record).await? {
            return Err(CustodyError::InvalidRequest(format!(
                "account '{name}' already exists"
            )));
        }
        info!(name, address = %account.address(), "account created");

        match funding {
            Some((balance, funder)) => {
                let payment = SignRequest::Payment(PaymentRequest {
                    source: funder,
                    destination: None,
                    destination_address: Some(account.address()),
                    amount: balance,
                    asset_code: NATIVE_CURRENCY.to_string(),
                    asset_issuer: None,
                    memo: None,
                });
                let outcome = self.sign_and_submit(payment).await;
                require_applied(name, outcome.map(|s| s.submission))?;
            }
            None => {
                if let Some(faucet) = &self.faucet {
                    let outcome = self.fund_from_faucet(faucet, account.id()).await;
                    require_applied(name, outcome)?;
                }
            }
        }

        Ok(account.view())
    }

    pub async fn read_account(&self, name: &str) -> CustodyResult<AccountView> {
        Ok(self.load_account(name).await?.view())
    }

    pub async fn list_accounts(&self) -> CustodyResult<Vec<String>> {
        Ok(self.store.list(ACCOUNTS_PREFIX).await?)
    }

    async fn load_account(&self, name: &str) -> CustodyResult<Account> {
        validate_account_name(name)?;
        let entry = self
            .store
            .get(&account_key(name))
            .await?
            .ok_or_else(|| CustodyError::AccountNotFound(name.to_string()))?;
        let record: AccountRecord = entry.decode_json()?;
        Ok(record.into_account()?)
    }

    async fn fund_from_faucet(
        &self,
        faucet: &FaucetClient,
        destination: AccountId,
    ) -> CustodyResult<SubmitResult> {
        let issued = faucet.generate_account().await?;
        let funder = Account::from_secret(issued.secret.expose_secret())?;
        if funder.id() != issued.address {
            return Err(CustodyError::KeyDerivation(
                "faucet secret does not match the faucet address".into(),
            ));
        }

        let tx = TransactionBuilder::new(TransactionType::Payment, funder.id())
            .destination(destination)
            .amount(Amount::Native(self.faucet_funding_drops))
            .build()?;
        let (_, submission) = self.execute(&funder, tx, true).await?;
        submission.ok_or_else(|| CustodyError::NetworkUnavailable("no submit result".into()))
    }

    // -----------------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------------

    /// Run the pipeline and return the signed transaction. Nothing is sent.
    pub async fn sign(&self, request: SignRequest) -> CustodyResult<SignedTransaction> {
        let span = info_span!("sign", request_id = %Uuid::new_v4(), kind = request.kind());
        async move {
            let (account, tx) = self.prepare(&request).await?;
            let (signed, _) = self.execute(&account, tx, false).await?;
            Ok(signed)
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline and submit while still holding the account's lease,
    /// so the next request for the account sees the advanced sequence.
    pub async fn sign_and_submit(&self, request: SignRequest) -> CustodyResult<SubmittedTransaction> {
        let span = info_span!(
            "sign_and_submit",
            request_id = %Uuid::new_v4(),
            kind = request.kind()
        );
        async move {
            let (account, tx) = self.prepare(&request).await?;
            let (signed, submission) = self.execute(&account, tx, true).await?;
            let submission = submission
                .ok_or_else(|| CustodyError::NetworkUnavailable("no submit result".into()))?;
            Ok(SubmittedTransaction { signed, submission })
        }
        .instrument(span)
        .await
    }

    /// Forward an already-signed blob to the ledger. The blob must decode
    /// and carry a signature; anything else is the caller's mistake.
    pub async fn submit(&self, blob_hex: &str) -> CustodyResult<SubmitResponse> {
        let bytes = hex::decode(blob_hex.trim())
            .map_err(|e| CustodyError::InvalidRequest(format!("blob is not hex: {e}")))?;
        let tx = codec::decode(&bytes)
            .map_err(|e| CustodyError::InvalidRequest(format!("blob does not decode: {e}")))?;
        if !tx.is_signed() {
            return Err(CustodyError::InvalidRequest(
                "blob is not a signed transaction".into(),
            ));
        }
        let result = self.ledger().submit(&bytes).await?;
        info!(
            hash = tx.hash_hex().as_deref().unwrap_or_default(),
            engine_result = %result.engine_result,
            "blob submitted"
        );
        Ok(SubmitResponse {
            transaction_hash: tx.hash_hex(),
            result,
        })
    }

    /// Validate, load, authorize, and build. No ledger access.
    async fn prepare(&self, request: &SignRequest) -> CustodyResult<(Account, Transaction)> {
        let validated = request.validate()?;
        let source = self.load_account(validated.source()).await?;

        let tx = match validated {
            ValidatedRequest::Payment(payment) => {
                let destination = match payment.destination {
                    Destination::Named(name) => self.load_account(&name).await?.id(),
                    Destination::Address(id) => id,
                };

                let decision =
                    policy::authorize(&source, &payment.policy_amount, &destination.to_address());
                if let Some(reason) = &decision.reason {
                    info!(
                        account = %source.address(),
                        %destination,
                        reason = %reason,
                        "payment refused by policy"
                    );
                }
                decision.into_result()?;

                let mut builder = TransactionBuilder::new(TransactionType::Payment, source.id())
                    .destination(destination)
                    .amount(payment.amount);
                if let Some(memo) = payment.memo {
                    builder = builder.memo(memo);
                }
                builder.build()?
            }
            ValidatedRequest::AccountSet {
                set_flag,
                clear_flag,
                domain,
                ..
            } => TransactionBuilder::new(TransactionType::AccountSet, source.id())
                .set_flag(set_flag)
                .clear_flag(clear_flag)
                .domain(domain)
                .build()?,
            ValidatedRequest::TrustSet { limit_amount, .. } => {
                TransactionBuilder::new(TransactionType::TrustSet, source.id())
                    .limit_amount(limit_amount)
                    .build()?
            }
        };
        debug!(kind = %tx.transaction_type(), "transaction built");
        Ok((source, tx))
    }

    /// Sequence, sign, encode and optionally submit under the account's
    /// lease.
    async fn execute(
        &self,
        account: &Account,
        mut tx: Transaction,
        submit: bool,
    ) -> CustodyResult<(SignedTransaction, Option<SubmitResult>)> {
        let mut lease = self.sequencer.acquire(account.id()).await;
        self.sequencer.assign_sequence(&mut lease, &mut tx).await?;
        sign_transaction(&mut tx, account)?;
        lease.mark_signed();

        let encoded = match codec::encode(&tx) {
            Ok(encoded) => encoded,
            Err(e) => {
                tx.fail();
                return Err(e.into());
            }
        };
        tx.state = TransactionState::Encoded;
        let signed = summarize(&tx, &encoded)?;
        info!(
            account = %signed.source_address,
            sequence = signed.sequence,
            hash = %signed.transaction_hash,
            "transaction signed"
        );

        let submission = if submit {
            let result = self.ledger().submit(&encoded.raw).await?;
            if !result.is_success() {
                warn!(
                    hash = %signed.transaction_hash,
                    engine_result = %result.engine_result,
                    "ledger did not apply transaction"
                );
            }
            Some(result)
        } else {
            None
        };

        lease.release();
        Ok((signed, submission))
    }
}

fn summarize(tx: &Transaction, encoded: &EncodedTransaction) -> CustodyResult<SignedTransaction> {
    let transaction_hash = tx
        .hash_hex()
        .ok_or_else(|| CustodyError::Signing("signed transaction has no hash".into()))?;
    Ok(SignedTransaction {
        source_address: tx.account.to_address(),
        transaction_type: tx.transaction_type(),
        sequence: tx.sequence,
        fee: tx.fee,
        transaction_hash,
        signed_transaction_hex: encoded.hex.clone(),
    })
}

fn require_applied(name: &str, outcome: CustodyResult<SubmitResult>) -> CustodyResult<()> {
    match outcome {
        Ok(result) if result.is_success() => {
            info!(name, "account funded");
            Ok(())
        }
        Ok(result) => {
            warn!(name, engine_result = %result.engine_result, "funding payment not applied");
            Err(CustodyError::NetworkUnavailable(format!(
                "funding payment for '{name}' was not applied: {} ({})",
                result.engine_result, result.engine_result_message
            )))
        }
        Err(e) => {
            warn!(name, error = %e, "funding failed");
            Err(e)
        }
    }
}

fn account_key(name: &str) -> String {
    format!("{ACCOUNTS_PREFIX}{name}")
}

fn clean_list(entries: Vec<String>) -> impl Iterator<Item = String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Names are a word character, optionally followed by word characters,
/// dots or dashes, ending in a word character.
pub fn validate_account_name(name: &str) -> CustodyResult<()> {
    let mut chars = name.chars();
    let valid = match (chars.next(), chars.next_back()) {
        (Some(first), None) => is_word_char(first),
        (Some(first), Some(last)) => {
            is_word_char(first)
                && is_word_char(last)
                && chars.all(|c| is_word_char(c) || c == '.' || c == '-')
        }
        (None, _) => false,
    };
    if !valid {
        return Err(CustodyError::InvalidRequest(format!(
            "'{name}' is not a valid account name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::storage::MemoryStore;

    fn service() -> (CustodyService, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let service = CustodyService::new(Arc::new(MemoryStore::new()), ledger.clone());
        (service, ledger)
    }

    #[test]
    fn account_names() {
        for good in ["a", "alice", "ops.hot-1", "a_b", "x9"] {
            assert!(validate_account_name(good).is_ok(), "{good}");
        }
        for bad in ["", "-a", "a-", ".a", "a.", "a/b", "a b", "accounts/x", "élise", "bob²"] {
            assert!(validate_account_name(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn create_then_read_and_list() {
        let (service, _) = service();
        let created = service
            .create_account(
                "alice",
                CreateAccountRequest {
                    spend_limit: 1000,
                    whitelist: vec![" rW ".into(), "".into()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(created.account_id.starts_with('r'));
        assert_eq!(created.spend_limit, 1000);
        assert_eq!(created.whitelist.len(), 1);
        assert!(created.whitelist.contains("rW"));

        assert_eq!(service.read_account("alice").await.unwrap(), created);
        assert_eq!(service.list_accounts().await.unwrap(), vec!["alice"]);
    }

    #[test]
    fn create_request_rejects_unknown_fields() {
        let parsed: Result<CreateAccountRequest, _> =
            serde_json::from_str(r#"{"spendLimit":5,"spendlimit":10}"#);
        assert!(parsed.is_err());
        let parsed: CreateAccountRequest = serde_json::from_str(r#"{"spendLimit":5}"#).unwrap();
        assert_eq!(parsed.spend_limit, 5);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let (service, _) = service();
        service
            .create_account("alice", CreateAccountRequest::default())
            .await
            .unwrap();
        let err = service
            .create_account("alice", CreateAccountRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CustodyError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn half_specified_funding_is_rejected_before_creation() {
        let (service, _) = service();
        let err = service
            .create_account(
                "alice",
                CreateAccountRequest {
                    starting_balance: Some("100".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CustodyError::InvalidRequest(_)));
        assert!(service.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let (service, _) = service();
        assert!(matches!(
            service.read_account("ghost").await,
            Err(CustodyError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn submit_rejects_unsigned_and_garbage_blobs() {
        let (service, _) = service();
        assert!(matches!(
            service.submit("not hex").await,
            Err(CustodyError::InvalidRequest(_))
        ));

        let tx = TransactionBuilder::new(TransactionType::AccountSet, AccountId::from_bytes([1; 20]))
            .build()
            .unwrap();
        let blob = hex::encode_upper(codec::serialize(&tx).unwrap());
        assert!(matches!(
            service.submit(&blob).await,
            Err(CustodyError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn submit_rejects_nested_memo_bombs() {
        let (service, ledger) = service();
        let blob = format!("120003{}", "F9EA".repeat(100_000));
        assert!(matches!(
            service.submit(&blob).await,
            Err(CustodyError::InvalidRequest(_))
        ));
        assert!(ledger.accepted().is_empty());
    }
}
