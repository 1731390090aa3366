//! End-to-end tests for the custody pipeline.
//!
//! Each test builds a `CustodyService` over its own store and an
//! `InMemoryLedger`, creates accounts through the service, and drives
//! requests all the way to a signed blob (and, where it matters, through
//! submission). Blobs are decoded back and checked field by field, so
//! these tests also pin the codec and the signer to each other.

use std::sync::Arc;
use std::time::Duration;

use xrpl_custody::codec;
use xrpl_custody::identity::{AccountId, AccountView};
use xrpl_custody::ledger::InMemoryLedger;
use xrpl_custody::storage::{MemoryStore, SledStore};
use xrpl_custody::transaction::{
    verify_transaction_signature, AccountSetRequest, Amount, PaymentRequest, SignRequest,
    TransactionKind, TransactionState, TransactionType, TrustLineRequest,
};
use xrpl_custody::{CreateAccountRequest, CustodyError, CustodyService};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

fn setup_with(ledger: InMemoryLedger) -> (CustodyService, Arc<InMemoryLedger>) {
    let ledger = Arc::new(ledger);
    let service = CustodyService::new(Arc::new(MemoryStore::new()), ledger.clone());
    (service, ledger)
}

fn setup() -> (CustodyService, Arc<InMemoryLedger>) {
    setup_with(InMemoryLedger::new())
}

fn id_of(view: &AccountView) -> AccountId {
    AccountId::from_address(&view.account_id).unwrap()
}

/// Create `name` in custody and make it exist on the ledger at `sequence`.
async fn funded(
    service: &CustodyService,
    ledger: &InMemoryLedger,
    name: &str,
    policy: CreateAccountRequest,
    sequence: u32,
) -> AccountView {
    let view = service.create_account(name, policy).await.unwrap();
    ledger.fund(id_of(&view), sequence);
    view
}

fn pay(source: &str, destination: &str, amount: &str) -> SignRequest {
    SignRequest::Payment(PaymentRequest {
        source: source.into(),
        destination: Some(destination.into()),
        destination_address: None,
        amount: amount.into(),
        asset_code: "XRP".into(),
        asset_issuer: None,
        memo: None,
    })
}

fn limited(spend_limit: u64) -> CreateAccountRequest {
    CreateAccountRequest {
        spend_limit,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn payment_within_limit_is_signed_with_ledger_sequence() {
    let (service, ledger) = setup();
    let alice = funded(&service, &ledger, "alice", limited(1000), 42).await;
    let bob = service
        .create_account("bob", CreateAccountRequest::default())
        .await
        .unwrap();

    let signed = service.sign(pay("alice", "bob", "35")).await.unwrap();
    assert_eq!(signed.sequence, 42);
    assert_eq!(signed.fee, 10);
    assert_eq!(signed.source_address, alice.account_id);
    assert_eq!(signed.transaction_type, TransactionType::Payment);
    assert_eq!(signed.transaction_hash.len(), 64);

    let tx = codec::decode_hex(&signed.signed_transaction_hex).unwrap();
    assert_eq!(tx.state, TransactionState::Signed);
    assert_eq!(tx.account, id_of(&alice));
    assert_eq!(tx.sequence, 42);
    assert_eq!(tx.fee, 10);
    assert_eq!(tx.flags, 0);
    assert_eq!(
        tx.kind,
        TransactionKind::Payment {
            destination: id_of(&bob),
            amount: Amount::Native(35),
        }
    );
    assert!(verify_transaction_signature(&tx));
    assert_eq!(tx.hash_hex().as_deref(), Some(signed.transaction_hash.as_str()));

    // Signing alone never advances the ledger.
    assert_eq!(ledger.sequence_of(&id_of(&alice)), Some(42));
}

#[tokio::test]
async fn payment_over_limit_is_refused_before_the_ledger_is_asked() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", limited(1000), 1).await;
    service
        .create_account("bob", CreateAccountRequest::default())
        .await
        .unwrap();

    let err = service.sign(pay("alice", "bob", "1001")).await.unwrap_err();
    assert!(matches!(
        err,
        CustodyError::PolicyViolation { ref reason } if reason.contains("limit")
    ));
    assert_eq!(ledger.fetch_count(), 0);
}

#[tokio::test]
async fn blacklisted_and_unlisted_destinations_are_refused() {
    let (service, ledger) = setup();
    let bob = service
        .create_account("bob", CreateAccountRequest::default())
        .await
        .unwrap();
    let carol = service
        .create_account("carol", CreateAccountRequest::default())
        .await
        .unwrap();
    funded(
        &service,
        &ledger,
        "alice",
        CreateAccountRequest {
            whitelist: vec![carol.account_id.clone()],
            blacklist: vec![bob.account_id.clone()],
            ..Default::default()
        },
        1,
    )
    .await;

    let err = service.sign(pay("alice", "bob", "1")).await.unwrap_err();
    assert!(matches!(
        err,
        CustodyError::PolicyViolation { ref reason } if reason.contains("blacklisted")
    ));

    let outsider = SignRequest::Payment(PaymentRequest {
        source: "alice".into(),
        destination: None,
        destination_address: Some(ISSUER.into()),
        amount: "1".into(),
        asset_code: "XRP".into(),
        asset_issuer: None,
        memo: None,
    });
    let err = service.sign(outsider).await.unwrap_err();
    assert!(matches!(
        err,
        CustodyError::PolicyViolation { ref reason } if reason.contains("whitelist")
    ));

    assert!(service.sign(pay("alice", "carol", "1")).await.is_ok());
}

#[tokio::test]
async fn unknown_source_or_destination_is_account_not_found() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 1).await;

    assert!(matches!(
        service.sign(pay("ghost", "alice", "1")).await,
        Err(CustodyError::AccountNotFound(_))
    ));
    assert!(matches!(
        service.sign(pay("alice", "ghost", "1")).await,
        Err(CustodyError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn issued_payment_with_memo_round_trips() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 3).await;

    let request = SignRequest::Payment(PaymentRequest {
        source: "alice".into(),
        destination: None,
        destination_address: Some(ISSUER.into()),
        amount: "250".into(),
        asset_code: "USD".into(),
        asset_issuer: Some(ISSUER.into()),
        memo: Some("invoice 7".into()),
    });
    let signed = service.sign(request).await.unwrap();
    let tx = codec::decode_hex(&signed.signed_transaction_hex).unwrap();

    let TransactionKind::Payment { amount, .. } = &tx.kind else {
        panic!("expected a payment");
    };
    assert_eq!(amount.to_string(), format!("250/USD/{ISSUER}"));
    assert_eq!(tx.memos.len(), 1);
    assert_eq!(tx.memos[0].memo_data.as_deref(), Some(&b"invoice 7"[..]));
    assert!(verify_transaction_signature(&tx));
}

// ---------------------------------------------------------------------------
// Trust lines and account settings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trust_line_with_empty_issuer_is_invalid_address() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 1).await;

    let err = service
        .sign(SignRequest::TrustSet(TrustLineRequest {
            account: "alice".into(),
            currency_code: "SRC".into(),
            issuer: String::new(),
            limit: "1000000".into(),
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, CustodyError::InvalidAddress(_)));
    assert_eq!(ledger.fetch_count(), 0);
}

#[tokio::test]
async fn trust_line_ignores_spend_limit() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", limited(1), 5).await;

    let signed = service
        .sign(SignRequest::TrustSet(TrustLineRequest {
            account: "alice".into(),
            currency_code: "SRC".into(),
            issuer: ISSUER.into(),
            limit: "1000000".into(),
        }))
        .await
        .unwrap();
    assert_eq!(signed.transaction_type, TransactionType::TrustSet);
    assert_eq!(signed.sequence, 5);

    let tx = codec::decode_hex(&signed.signed_transaction_hex).unwrap();
    let TransactionKind::TrustSet { limit_amount } = tx.kind else {
        panic!("expected a trust set");
    };
    assert_eq!(limit_amount.to_string(), format!("1000000/SRC/{ISSUER}"));
}

#[tokio::test]
async fn account_set_carries_domain_and_flags() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 9).await;

    let signed = service
        .sign(SignRequest::AccountSet(AccountSetRequest {
            account: "alice".into(),
            set_flag: Some(8),
            clear_flag: None,
            domain: Some("example.com".into()),
        }))
        .await
        .unwrap();
    let tx = codec::decode_hex(&signed.signed_transaction_hex).unwrap();
    assert_eq!(
        tx.kind,
        TransactionKind::AccountSet {
            set_flag: Some(8),
            clear_flag: None,
            domain: Some(b"example.com".to_vec()),
        }
    );
}

// ---------------------------------------------------------------------------
// Submission and sequencing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signed_blob_submits_once() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 1).await;
    service
        .create_account("bob", CreateAccountRequest::default())
        .await
        .unwrap();

    let signed = service.sign(pay("alice", "bob", "1000")).await.unwrap();
    let first = service.submit(&signed.signed_transaction_hex).await.unwrap();
    assert_eq!(first.result.engine_result, "tesSUCCESS");
    assert_eq!(
        first.transaction_hash.as_deref(),
        Some(signed.transaction_hash.as_str())
    );

    let replay = service.submit(&signed.signed_transaction_hex).await.unwrap();
    assert_eq!(replay.result.engine_result, "tefPAST_SEQ");
}

#[tokio::test]
async fn concurrent_submissions_get_strictly_increasing_sequences() {
    let (service, ledger) = setup_with(InMemoryLedger::new().with_latency(Duration::from_millis(5)));
    let alice = funded(&service, &ledger, "alice", CreateAccountRequest::default(), 100).await;
    service
        .create_account("bob", CreateAccountRequest::default())
        .await
        .unwrap();

    let results = futures::future::join_all(
        (0..6).map(|_| service.sign_and_submit(pay("alice", "bob", "10"))),
    )
    .await;

    let mut sequences: Vec<u32> = results
        .into_iter()
        .map(|r| {
            let submitted = r.unwrap();
            assert!(submitted.submission.is_success());
            submitted.signed.sequence
        })
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (100..106).collect::<Vec<_>>());
    assert_eq!(ledger.sequence_of(&id_of(&alice)), Some(106));
    assert_eq!(ledger.accepted().len(), 6);
    assert_eq!(ledger.max_concurrent_fetches(), 1);
}

#[tokio::test]
async fn different_accounts_sign_in_parallel() {
    let (service, ledger) =
        setup_with(InMemoryLedger::new().with_latency(Duration::from_millis(50)));
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 1).await;
    funded(&service, &ledger, "bob", CreateAccountRequest::default(), 1).await;

    let (a, b) = tokio::join!(
        service.sign(pay("alice", "bob", "1")),
        service.sign(pay("bob", "alice", "1")),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(ledger.max_concurrent_fetches(), 2);
}

#[tokio::test]
async fn offline_ledger_is_network_unavailable() {
    let (service, ledger) = setup();
    funded(&service, &ledger, "alice", CreateAccountRequest::default(), 1).await;
    service
        .create_account("bob", CreateAccountRequest::default())
        .await
        .unwrap();
    ledger.set_offline(true);

    assert!(matches!(
        service.sign(pay("alice", "bob", "1")).await,
        Err(CustodyError::NetworkUnavailable(_))
    ));
}

#[tokio::test]
async fn source_missing_from_ledger_is_account_not_found() {
    let (service, _ledger) = setup();
    service
        .create_account("alice", CreateAccountRequest::default())
        .await
        .unwrap();

    assert!(matches!(
        service.sign(pay("alice", "alice", "1")).await,
        Err(CustodyError::AccountNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Account creation and funding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_account_is_funded_from_another_custody_account() {
    let (service, ledger) = setup();
    let treasury = funded(&service, &ledger, "treasury", CreateAccountRequest::default(), 1).await;

    let carol = service
        .create_account(
            "carol",
            CreateAccountRequest {
                starting_balance: Some("20000000".into()),
                funding_account: Some("treasury".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(ledger.sequence_of(&id_of(&carol)), Some(1));
    assert_eq!(ledger.sequence_of(&id_of(&treasury)), Some(2));
    let accepted = ledger.accepted();
    assert_eq!(accepted.len(), 1);
    assert_eq!(
        accepted[0].kind,
        TransactionKind::Payment {
            destination: id_of(&carol),
            amount: Amount::Native(20_000_000),
        }
    );
}

#[tokio::test]
async fn failed_funding_keeps_the_account() {
    let (service, _ledger) = setup();

    let err = service
        .create_account(
            "dave",
            CreateAccountRequest {
                starting_balance: Some("1000".into()),
                funding_account: Some("ghost".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustodyError::AccountNotFound(_)));
    assert_eq!(service.list_accounts().await.unwrap(), vec!["dave"]);
}

#[tokio::test]
async fn accounts_survive_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store");

    let created = {
        let store = SledStore::open(&path).unwrap();
        let service = CustodyService::new(Arc::new(store), Arc::new(InMemoryLedger::new()));
        service
            .create_account("alice", limited(500))
            .await
            .unwrap()
    };

    let ledger = Arc::new(InMemoryLedger::new());
    let service = CustodyService::new(Arc::new(SledStore::open(&path).unwrap()), ledger.clone());
    let restored = service.read_account("alice").await.unwrap();
    assert_eq!(restored, created);

    ledger.fund(id_of(&restored), 4);
    let signed = service
        .sign(SignRequest::AccountSet(AccountSetRequest {
            account: "alice".into(),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(signed.source_address, created.account_id);
}
