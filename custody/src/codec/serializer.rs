//! Transaction -> canonical bytes.

use super::amount::write_amount;
use super::binary::write_vl;
use super::field::{Field, ARRAY_END_MARKER, OBJECT_END_MARKER};
use super::{CodecError, FieldValue};
use crate::transaction::builder::{Transaction, TransactionKind};
use crate::transaction::types::Memo;

/// Flatten a transaction into its ledger fields, unordered.
pub(crate) fn transaction_fields(tx: &Transaction) -> Vec<(Field, FieldValue)> {
    let mut fields = vec![
        (
            Field::TransactionType,
            FieldValue::UInt16(tx.transaction_type().code()),
        ),
        (Field::Flags, FieldValue::UInt32(tx.flags)),
        (Field::Sequence, FieldValue::UInt32(tx.sequence)),
        (Field::Fee, FieldValue::Amount(crate::transaction::Amount::Native(tx.fee))),
        (Field::Account, FieldValue::AccountId(tx.account)),
    ];

    match &tx.kind {
        TransactionKind::Payment {
            destination,
            amount,
        } => {
            fields.push((Field::Destination, FieldValue::AccountId(*destination)));
            fields.push((Field::Amount, FieldValue::Amount(*amount)));
        }
        TransactionKind::AccountSet {
            set_flag,
            clear_flag,
            domain,
        } => {
            if let Some(flag) = set_flag {
                fields.push((Field::SetFlag, FieldValue::UInt32(*flag)));
            }
            if let Some(flag) = clear_flag {
                fields.push((Field::ClearFlag, FieldValue::UInt32(*flag)));
            }
            if let Some(domain) = domain {
                fields.push((Field::Domain, FieldValue::Blob(domain.clone())));
            }
        }
        TransactionKind::TrustSet { limit_amount } => {
            fields.push((Field::LimitAmount, FieldValue::Amount(*limit_amount)));
        }
    }

    if !tx.memos.is_empty() {
        let memos = tx.memos.iter().map(memo_object).collect();
        fields.push((Field::Memos, FieldValue::Array(memos)));
    }
    if let Some(public_key) = &tx.signing_pub_key {
        fields.push((
            Field::SigningPubKey,
            FieldValue::Blob(public_key.as_bytes().to_vec()),
        ));
    }
    if let Some(signature) = &tx.signature {
        fields.push((Field::TxnSignature, FieldValue::Blob(signature.clone())));
    }
    fields
}

fn memo_object(memo: &Memo) -> (Field, FieldValue) {
    let parts = [
        (Field::MemoType, &memo.memo_type),
        (Field::MemoData, &memo.memo_data),
        (Field::MemoFormat, &memo.memo_format),
    ];
    let inner = parts
        .into_iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (field, FieldValue::Blob(v.clone()))))
        .collect();
    (Field::Memo, FieldValue::Object(inner))
}

/// Write fields in canonical order. With `signing_only`, the signature is
/// left out.
pub(crate) fn write_fields(
    fields: &[(Field, FieldValue)],
    signing_only: bool,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let mut ordered: Vec<&(Field, FieldValue)> = fields
        .iter()
        .filter(|(field, _)| !signing_only || field.is_signing_field())
        .collect();
    ordered.sort_by_key(|(field, _)| field.id());

    for (field, value) in ordered {
        field.id().write_header(out);
        write_value(*field, value, signing_only, out)?;
    }
    Ok(())
}

fn write_value(
    field: Field,
    value: &FieldValue,
    signing_only: bool,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    match value {
        FieldValue::UInt16(v) => out.extend_from_slice(&v.to_be_bytes()),
        FieldValue::UInt32(v) => out.extend_from_slice(&v.to_be_bytes()),
        FieldValue::Amount(amount) => write_amount(amount, out)?,
        FieldValue::Blob(bytes) => write_vl(bytes, out)?,
        FieldValue::AccountId(id) => write_vl(id.as_bytes(), out)?,
        FieldValue::Object(inner) => {
            write_fields(inner, signing_only, out)?;
            out.push(OBJECT_END_MARKER);
        }
        FieldValue::Array(items) => {
            for (item_field, item) in items {
                if !matches!(item, FieldValue::Object(_)) {
                    return Err(CodecError::InvalidField {
                        field: field.name(),
                        reason: "array elements must be objects".into(),
                    });
                }
                item_field.id().write_header(out);
                write_value(*item_field, item, signing_only, out)?;
            }
            out.push(ARRAY_END_MARKER);
        }
    }
    Ok(())
}
