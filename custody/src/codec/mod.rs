//! # Canonical Binary Codec
//!
//! The XRP Ledger signs and hashes a transaction's *canonical* binary form:
//! every field prefixed by a compact header, all fields sorted by
//! `(type code, field code)`, variable-length data length-prefixed. Two
//! implementations that disagree on a single byte here produce two different
//! signatures, and the ledger only accepts one of them.
//!
//! ## Entry points
//!
//! - [`signing_data`]: `STX\0` prefix plus every field except the signature.
//!   This is what gets SHA-512Half'd and signed.
//! - [`encode`]: the full signed blob (`tx_blob`) plus its hex, for submit.
//! - [`transaction_hash`]: `SHA-512Half("TXN\0" || blob)`, the transaction id.
//! - [`decode`]: blob back into a [`Transaction`], strictly.
//!
//! ## Layout
//!
//! ```text
//! codec/
//!   field.rs         field headers and the field table
//!   binary.rs        length prefixes and the bounds-checked reader
//!   amount.rs        native and issued amount layouts
//!   serializer.rs    transaction -> fields -> bytes
//!   deserializer.rs  bytes -> fields -> transaction
//! ```

pub mod amount;
pub mod binary;
pub mod deserializer;
pub mod field;
pub mod serializer;

use crate::config::{HASH_PREFIX_TX_ID, HASH_PREFIX_TX_SIGN};
use crate::crypto::hash::prefixed_hash;
use crate::identity::address::AccountId;
use crate::transaction::builder::Transaction;
use crate::transaction::types::{Amount, TransactionState};
use binary::BinaryReader;
use field::Field;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("length {0} exceeds the variable-length maximum")]
    LengthOverflow(usize),

    #[error("invalid length prefix byte {0:#04x}")]
    InvalidLengthPrefix(u8),

    #[error("unknown field (type {type_code}, field {field_code})")]
    UnknownField { type_code: u8, field_code: u8 },

    #[error("unknown transaction type {0}")]
    UnknownTransactionType(u16),

    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("field {0} is out of canonical order or repeated")]
    NonCanonicalOrder(&'static str),

    #[error("field {0} does not belong to this transaction")]
    UnexpectedField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("transaction is not signed")]
    NotSigned,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A decoded field value. Objects and arrays carry their members in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldValue {
    UInt16(u16),
    UInt32(u32),
    Amount(Amount),
    Blob(Vec<u8>),
    AccountId(AccountId),
    Object(Vec<(Field, FieldValue)>),
    Array(Vec<(Field, FieldValue)>),
}

/// A signed transaction ready for `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTransaction {
    pub raw: Vec<u8>,
    /// Uppercase hex of `raw`, the `tx_blob` the ledger expects.
    pub hex: String,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Canonical bytes of every field the transaction currently carries.
pub fn serialize(tx: &Transaction) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(256);
    serializer::write_fields(&serializer::transaction_fields(tx), false, &mut out)?;
    Ok(out)
}

/// The bytes a signature commits to.
pub fn signing_data(tx: &Transaction) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(&HASH_PREFIX_TX_SIGN);
    serializer::write_fields(&serializer::transaction_fields(tx), true, &mut out)?;
    Ok(out)
}

pub fn transaction_hash(raw: &[u8]) -> [u8; 32] {
    prefixed_hash(HASH_PREFIX_TX_ID, raw)
}

/// Encode a signed transaction for submission.
pub fn encode(tx: &Transaction) -> Result<EncodedTransaction, CodecError> {
    let signed = matches!(
        tx.state,
        TransactionState::Signed | TransactionState::Encoded
    );
    if !signed || tx.signature.is_none() || tx.signing_pub_key.is_none() {
        return Err(CodecError::NotSigned);
    }
    let raw = serialize(tx)?;
    let hex = hex::encode_upper(&raw);
    Ok(EncodedTransaction { raw, hex })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a canonical blob. Signed blobs come back `Signed` with their hash
/// filled in.
pub fn decode(bytes: &[u8]) -> Result<Transaction, CodecError> {
    let mut reader = BinaryReader::new(bytes);
    let fields = deserializer::read_fields(&mut reader, 0)?;
    let mut tx = deserializer::transaction_from_fields(fields)?;
    if tx.is_signed() {
        tx.hash = Some(transaction_hash(bytes));
    }
    Ok(tx)
}

pub fn decode_hex(blob: &str) -> Result<Transaction, CodecError> {
    let bytes = hex::decode(blob.trim())?;
    decode(&bytes)
}
