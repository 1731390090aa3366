//! Offline walkthrough of the custody lifecycle.
//!
//! Creates a few accounts against an in-process ledger, signs and submits
//! payments, lets the policy refuse one, and opens a trust line. Nothing
//! leaves the machine.
//!
//! Run with:
//!   cargo run -p xrpl-custody --example demo

use std::sync::Arc;
use std::time::Instant;

use xrpl_custody::identity::AccountId;
use xrpl_custody::ledger::InMemoryLedger;
use xrpl_custody::storage::MemoryStore;
use xrpl_custody::transaction::{PaymentRequest, SignRequest, TrustLineRequest};
use xrpl_custody::{CreateAccountRequest, CustodyResult, CustodyService};

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

fn step(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}== Step {num}: {title}{RESET}");
}

fn info(label: &str, value: impl std::fmt::Display) {
    println!("  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn ok(text: &str) {
    println!("  {GREEN}[OK]{RESET} {text}");
}

fn refused(text: impl std::fmt::Display) {
    println!("  {RED}[REFUSED]{RESET} {text}");
}

fn payment(source: &str, destination: &str, drops: &str) -> SignRequest {
    SignRequest::Payment(PaymentRequest {
        source: source.into(),
        destination: Some(destination.into()),
        destination_address: None,
        amount: drops.into(),
        asset_code: "XRP".into(),
        asset_issuer: None,
        memo: Some("demo".into()),
    })
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> CustodyResult<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let service = CustodyService::new(Arc::new(MemoryStore::new()), ledger.clone());

    step(1, "Create a treasury and give it a ledger presence");
    let treasury = service
        .create_account("treasury", CreateAccountRequest::default())
        .await?;
    let treasury_id = AccountId::from_address(&treasury.account_id)?;
    ledger.fund(treasury_id, 1);
    info("address", &treasury.account_id);
    info("public key", &treasury.public_key);

    step(2, "Create a spender funded by the treasury");
    let started = Instant::now();
    let spender = service
        .create_account(
            "spender",
            CreateAccountRequest {
                spend_limit: 5_000_000,
                starting_balance: Some("50000000".into()),
                funding_account: Some("treasury".into()),
                ..Default::default()
            },
        )
        .await?;
    info("address", &spender.account_id);
    info("spend limit (drops)", spender.spend_limit);
    println!("  {DIM}[{:.2} ms]{RESET}", started.elapsed().as_secs_f64() * 1000.0);
    service
        .create_account("merchant", CreateAccountRequest::default())
        .await?;

    step(3, "Pay the merchant within the limit");
    let submitted = service
        .sign_and_submit(payment("spender", "merchant", "1500000"))
        .await?;
    info("sequence", submitted.signed.sequence);
    info("hash", &submitted.signed.transaction_hash);
    info("engine result", &submitted.submission.engine_result);
    ok("payment applied");

    step(4, "Try to pay more than the limit allows");
    match service.sign(payment("spender", "merchant", "5000001")).await {
        Ok(signed) => info("unexpectedly signed", signed.transaction_hash),
        Err(e) => refused(e),
    }

    step(5, "Open a trust line toward the treasury");
    let signed = service
        .sign(SignRequest::TrustSet(TrustLineRequest {
            account: "spender".into(),
            currency_code: "USD".into(),
            issuer: treasury.account_id.clone(),
            limit: "1000".into(),
        }))
        .await?;
    info("blob", &signed.signed_transaction_hex);
    let result = service.submit(&signed.signed_transaction_hex).await?;
    info("engine result", &result.result.engine_result);

    println!();
    info("accounts", service.list_accounts().await?.join(", "));
    info("ledger transactions", ledger.accepted().len());
    Ok(())
}
