//! Transaction signing with secp256k1 account keys.
//!
//! Signing is its own step because it is the only step that touches private
//! key material, and it only makes sense once the sequence is fixed: the
//! sequence is part of the signed bytes, so a signature over sequence 0 is
//! worthless.
//!
//! ```text
//! digest    = SHA-512Half("STX\0" || canonical fields without TxnSignature)
//! signature = ECDSA-secp256k1(digest), low-S, DER
//! hash      = SHA-512Half("TXN\0" || canonical fields with TxnSignature)
//! ```

use super::builder::Transaction;
use super::types::TransactionState;
use crate::codec;
use crate::crypto::hash::sha512_half;
use crate::error::{CustodyError, CustodyResult};
use crate::identity::account::Account;
use crate::identity::address::AccountId;

/// Signs a transaction in place with the account's key.
///
/// The transaction must be `SequenceAssigned` and its `account` must be the
/// signing account. On success it is `Signed`, with `signing_pub_key`,
/// `signature` and `hash` set. On failure it is `Failed`.
pub fn sign_transaction(tx: &mut Transaction, account: &Account) -> CustodyResult<()> {
    tx.require_state(TransactionState::SequenceAssigned, CustodyError::Signing)?;
    let result = sign_in_place(tx, account);
    if result.is_err() {
        tx.fail();
    }
    result
}

fn sign_in_place(tx: &mut Transaction, account: &Account) -> CustodyResult<()> {
    let keypair = account
        .keypair()
        .map_err(|e| CustodyError::Signing(format!("account key unavailable: {e}")))?;

    let signer = AccountId::from_public_key(&keypair.public_key());
    if signer != tx.account {
        return Err(CustodyError::Signing(format!(
            "key for {signer} cannot sign for {}",
            tx.account
        )));
    }

    tx.signing_pub_key = Some(keypair.public_key());
    let digest = sha512_half(&[&codec::signing_data(tx)?]);
    let signature = keypair
        .sign_digest(&digest)
        .map_err(|e| CustodyError::Signing(e.to_string()))?;

    tx.signature = Some(signature);
    tx.state = TransactionState::Signed;
    tx.hash = Some(codec::transaction_hash(&codec::serialize(tx)?));
    Ok(())
}

/// Check a signed transaction's signature against its own `SigningPubKey`,
/// and that the key belongs to the sending account.
pub fn verify_transaction_signature(tx: &Transaction) -> bool {
    let (Some(public_key), Some(signature)) = (&tx.signing_pub_key, &tx.signature) else {
        return false;
    };
    if AccountId::from_public_key(public_key) != tx.account {
        return false;
    }
    match codec::signing_data(tx) {
        Ok(data) => public_key.verify_digest(&sha512_half(&[&data]), signature),
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
