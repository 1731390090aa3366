//! Canonical bytes -> transaction.
//!
//! Strict on purpose: unknown fields, fields out of canonical order, and
//! fields that do not belong to the decoded transaction type are errors.
//! Anything we accept re-encodes to exactly the bytes we were given.

use super::amount::read_amount;
use super::binary::BinaryReader;
use super::field::{type_code, Field, FieldId, ARRAY_END_MARKER, OBJECT_END_MARKER};
use super::{CodecError, FieldValue};
use crate::config::ACCOUNT_ID_LENGTH;
use crate::crypto::keys::PublicKey;
use crate::identity::address::AccountId;
use crate::transaction::builder::{Transaction, TransactionKind};
use crate::transaction::types::{Amount, Memo, TransactionState, TransactionType};
use std::collections::HashMap;

/// Containers may only appear at the top level: `Memos` holds `Memo`
/// objects, and a `Memo` holds only blobs.
const MAX_CONTAINER_DEPTH: usize = 1;

/// Read fields until the input ends (`depth == 0`) or an object end marker
/// is consumed (`depth > 0`).
pub(crate) fn read_fields(
    reader: &mut BinaryReader<'_>,
    depth: usize,
) -> Result<Vec<(Field, FieldValue)>, CodecError> {
    let nested = depth > 0;
    let mut fields = Vec::new();
    let mut previous: Option<FieldId> = None;

    loop {
        if !nested && reader.is_empty() {
            break;
        }
        if nested && reader.peek_u8() == Some(OBJECT_END_MARKER) {
            reader.read_u8()?;
            break;
        }

        let id = FieldId::read_header(reader)?;
        let field = Field::from_id(id).ok_or(CodecError::UnknownField {
            type_code: id.type_code,
            field_code: id.field_code,
        })?;
        if previous.is_some_and(|prev| id <= prev) {
            return Err(CodecError::NonCanonicalOrder(field.name()));
        }
        previous = Some(id);

        let value = read_value(field, id, reader, depth)?;
        fields.push((field, value));
    }
    Ok(fields)
}

fn read_value(
    field: Field,
    id: FieldId,
    reader: &mut BinaryReader<'_>,
    depth: usize,
) -> Result<FieldValue, CodecError> {
    let container = matches!(id.type_code, type_code::OBJECT | type_code::ARRAY);
    if container && depth >= MAX_CONTAINER_DEPTH {
        return Err(CodecError::InvalidField {
            field: field.name(),
            reason: "nested objects and arrays are not allowed here".into(),
        });
    }

    let value = match id.type_code {
        type_code::UINT16 => FieldValue::UInt16(reader.read_u16()?),
        type_code::UINT32 => FieldValue::UInt32(reader.read_u32()?),
        type_code::AMOUNT => FieldValue::Amount(read_amount(reader)?),
        type_code::BLOB => FieldValue::Blob(reader.read_vl()?.to_vec()),
        type_code::ACCOUNT_ID => {
            let bytes = reader.read_vl()?;
            if bytes.len() != ACCOUNT_ID_LENGTH {
                return Err(CodecError::InvalidField {
                    field: field.name(),
                    reason: format!("account id is {} bytes", bytes.len()),
                });
            }
            let mut id = [0u8; ACCOUNT_ID_LENGTH];
            id.copy_from_slice(bytes);
            FieldValue::AccountId(AccountId::from_bytes(id))
        }
        type_code::OBJECT => FieldValue::Object(read_fields(reader, depth + 1)?),
        type_code::ARRAY => {
            let mut items = Vec::new();
            loop {
                if reader.peek_u8() == Some(ARRAY_END_MARKER) {
                    reader.read_u8()?;
                    break;
                }
                let item_id = FieldId::read_header(reader)?;
                let item_field = Field::from_id(item_id)
                    .filter(|f| f.id().type_code == type_code::OBJECT)
                    .ok_or(CodecError::InvalidField {
                        field: field.name(),
                        reason: "array elements must be known objects".into(),
                    })?;
                items.push((
                    item_field,
                    FieldValue::Object(read_fields(reader, depth + 1)?),
                ));
            }
            FieldValue::Array(items)
        }
        other => {
            return Err(CodecError::UnknownField {
                type_code: other,
                field_code: id.field_code,
            })
        }
    };
    Ok(value)
}

/// Fields pulled out by name, with leftovers reported as errors.
struct FieldBag(HashMap<Field, FieldValue>);

impl FieldBag {
    fn take(&mut self, field: Field) -> Option<FieldValue> {
        self.0.remove(&field)
    }

    fn require(&mut self, field: Field) -> Result<FieldValue, CodecError> {
        self.take(field).ok_or(CodecError::MissingField(field.name()))
    }

    fn u32(&mut self, field: Field) -> Result<Option<u32>, CodecError> {
        match self.take(field) {
            None => Ok(None),
            Some(FieldValue::UInt32(v)) => Ok(Some(v)),
            Some(_) => Err(wrong_type(field)),
        }
    }

    fn amount(&mut self, field: Field) -> Result<Amount, CodecError> {
        match self.require(field)? {
            FieldValue::Amount(amount) => Ok(amount),
            _ => Err(wrong_type(field)),
        }
    }

    fn account(&mut self, field: Field) -> Result<AccountId, CodecError> {
        match self.require(field)? {
            FieldValue::AccountId(id) => Ok(id),
            _ => Err(wrong_type(field)),
        }
    }

    fn blob(&mut self, field: Field) -> Result<Option<Vec<u8>>, CodecError> {
        match self.take(field) {
            None => Ok(None),
            Some(FieldValue::Blob(bytes)) => Ok(Some(bytes)),
            Some(_) => Err(wrong_type(field)),
        }
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.0.into_keys().next() {
            Some(field) => Err(CodecError::UnexpectedField(field.name())),
            None => Ok(()),
        }
    }
}

fn wrong_type(field: Field) -> CodecError {
    CodecError::InvalidField {
        field: field.name(),
        reason: "unexpected value type".into(),
    }
}

pub(crate) fn transaction_from_fields(
    fields: Vec<(Field, FieldValue)>,
) -> Result<Transaction, CodecError> {
    let mut bag = FieldBag(fields.into_iter().collect());

    let code = match bag.require(Field::TransactionType)? {
        FieldValue::UInt16(code) => code,
        _ => return Err(wrong_type(Field::TransactionType)),
    };
    let tx_type =
        TransactionType::from_code(code).ok_or(CodecError::UnknownTransactionType(code))?;

    let account = bag.account(Field::Account)?;
    let sequence = bag
        .u32(Field::Sequence)?
        .ok_or(CodecError::MissingField(Field::Sequence.name()))?;
    let flags = bag
        .u32(Field::Flags)?
        .ok_or(CodecError::MissingField(Field::Flags.name()))?;
    let fee = match bag.amount(Field::Fee)? {
        Amount::Native(drops) => drops,
        Amount::Issued { .. } => {
            return Err(CodecError::InvalidField {
                field: Field::Fee.name(),
                reason: "fee must be a native amount".into(),
            })
        }
    };

    let kind = match tx_type {
        TransactionType::Payment => TransactionKind::Payment {
            destination: bag.account(Field::Destination)?,
            amount: bag.amount(Field::Amount)?,
        },
        TransactionType::AccountSet => TransactionKind::AccountSet {
            set_flag: bag.u32(Field::SetFlag)?,
            clear_flag: bag.u32(Field::ClearFlag)?,
            domain: bag.blob(Field::Domain)?,
        },
        TransactionType::TrustSet => TransactionKind::TrustSet {
            limit_amount: bag.amount(Field::LimitAmount)?,
        },
    };

    let memos = match bag.take(Field::Memos) {
        None => Vec::new(),
        Some(FieldValue::Array(items)) => items
            .into_iter()
            .map(|(_, value)| memo_from_object(value))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(wrong_type(Field::Memos)),
    };

    let signing_pub_key = bag
        .blob(Field::SigningPubKey)?
        .map(|bytes| {
            PublicKey::from_bytes(&bytes).map_err(|e| CodecError::InvalidField {
                field: Field::SigningPubKey.name(),
                reason: e.to_string(),
            })
        })
        .transpose()?;
    let signature = bag.blob(Field::TxnSignature)?;
    bag.finish()?;

    let state = if signature.is_some() {
        TransactionState::Signed
    } else if sequence != 0 {
        TransactionState::SequenceAssigned
    } else {
        TransactionState::Populated
    };

    Ok(Transaction {
        account,
        fee,
        sequence,
        flags,
        kind,
        memos,
        signing_pub_key,
        signature,
        hash: None,
        state,
    })
}

fn memo_from_object(value: FieldValue) -> Result<Memo, CodecError> {
    let FieldValue::Object(fields) = value else {
        return Err(wrong_type(Field::Memo));
    };
    let mut bag = FieldBag(fields.into_iter().collect());
    let memo = Memo {
        memo_type: bag.blob(Field::MemoType)?,
        memo_data: bag.blob(Field::MemoData)?,
        memo_format: bag.blob(Field::MemoFormat)?,
    };
    bag.finish()?;
    Ok(memo)
}
