//! Field definitions for the canonical binary format.
//!
//! Every serialized field starts with a header packing its *type code* and
//! *field code*. Fields are written in ascending `(type code, field code)`
//! order, which is why [`FieldId`] derives `Ord` in that order.
//!
//! ```text
//! type < 16, field < 16     [type << 4 | field]
//! type < 16, field >= 16    [type << 4, field]
//! type >= 16, field < 16    [field, type]
//! type >= 16, field >= 16   [0, type, field]
//! ```
//!
//! Only the fields our three transaction types can carry are listed. An
//! unknown field in a blob is a decode error, not something to skip over.

use super::binary::BinaryReader;
use super::CodecError;

pub mod type_code {
    pub const UINT16: u8 = 1;
    pub const UINT32: u8 = 2;
    pub const AMOUNT: u8 = 6;
    pub const BLOB: u8 = 7;
    pub const ACCOUNT_ID: u8 = 8;
    pub const OBJECT: u8 = 14;
    pub const ARRAY: u8 = 15;
}

/// Terminates an inner object.
pub const OBJECT_END_MARKER: u8 = 0xE1;

/// Terminates an array.
pub const ARRAY_END_MARKER: u8 = 0xF1;

/// `(type code, field code)`; ordering is canonical field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub type_code: u8,
    pub field_code: u8,
}

impl FieldId {
    pub const fn new(type_code: u8, field_code: u8) -> Self {
        Self {
            type_code,
            field_code,
        }
    }

    pub fn write_header(&self, out: &mut Vec<u8>) {
        let (t, f) = (self.type_code, self.field_code);
        match (t < 16, f < 16) {
            (true, true) => out.push((t << 4) | f),
            (true, false) => out.extend_from_slice(&[t << 4, f]),
            (false, true) => out.extend_from_slice(&[f, t]),
            (false, false) => out.extend_from_slice(&[0, t, f]),
        }
    }

    pub fn read_header(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let first = reader.read_u8()?;
        let mut type_code = first >> 4;
        let mut field_code = first & 0x0F;
        if type_code == 0 {
            type_code = reader.read_u8()?;
        }
        if field_code == 0 {
            field_code = reader.read_u8()?;
        }
        Ok(Self::new(type_code, field_code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TransactionType,
    Flags,
    Sequence,
    SetFlag,
    ClearFlag,
    Amount,
    LimitAmount,
    Fee,
    SigningPubKey,
    TxnSignature,
    Domain,
    MemoType,
    MemoData,
    MemoFormat,
    Account,
    Destination,
    Memo,
    Memos,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::TransactionType,
        Field::Flags,
        Field::Sequence,
        Field::SetFlag,
        Field::ClearFlag,
        Field::Amount,
        Field::LimitAmount,
        Field::Fee,
        Field::SigningPubKey,
        Field::TxnSignature,
        Field::Domain,
        Field::MemoType,
        Field::MemoData,
        Field::MemoFormat,
        Field::Account,
        Field::Destination,
        Field::Memo,
        Field::Memos,
    ];

    pub fn id(self) -> FieldId {
        use type_code::*;
        match self {
            Field::TransactionType => FieldId::new(UINT16, 2),
            Field::Flags => FieldId::new(UINT32, 2),
            Field::Sequence => FieldId::new(UINT32, 4),
            Field::SetFlag => FieldId::new(UINT32, 33),
            Field::ClearFlag => FieldId::new(UINT32, 34),
            Field::Amount => FieldId::new(AMOUNT, 1),
            Field::LimitAmount => FieldId::new(AMOUNT, 3),
            Field::Fee => FieldId::new(AMOUNT, 8),
            Field::SigningPubKey => FieldId::new(BLOB, 3),
            Field::TxnSignature => FieldId::new(BLOB, 4),
            Field::Domain => FieldId::new(BLOB, 7),
            Field::MemoType => FieldId::new(BLOB, 12),
            Field::MemoData => FieldId::new(BLOB, 13),
            Field::MemoFormat => FieldId::new(BLOB, 14),
            Field::Account => FieldId::new(ACCOUNT_ID, 1),
            Field::Destination => FieldId::new(ACCOUNT_ID, 3),
            Field::Memo => FieldId::new(OBJECT, 10),
            Field::Memos => FieldId::new(ARRAY, 9),
        }
    }

    pub fn from_id(id: FieldId) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::TransactionType => "TransactionType",
            Field::Flags => "Flags",
            Field::Sequence => "Sequence",
            Field::SetFlag => "SetFlag",
            Field::ClearFlag => "ClearFlag",
            Field::Amount => "Amount",
            Field::LimitAmount => "LimitAmount",
            Field::Fee => "Fee",
            Field::SigningPubKey => "SigningPubKey",
            Field::TxnSignature => "TxnSignature",
            Field::Domain => "Domain",
            Field::MemoType => "MemoType",
            Field::MemoData => "MemoData",
            Field::MemoFormat => "MemoFormat",
            Field::Account => "Account",
            Field::Destination => "Destination",
            Field::Memo => "Memo",
            Field::Memos => "Memos",
        }
    }

    /// Everything except the signature goes into the signing data.
    pub fn is_signing_field(self) -> bool {
        self != Field::TxnSignature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(field: Field) -> Vec<u8> {
        let mut out = Vec::new();
        field.id().write_header(&mut out);
        out
    }

    #[test]
    fn one_byte_headers() {
        assert_eq!(header(Field::TransactionType), vec![0x12]);
        assert_eq!(header(Field::Flags), vec![0x22]);
        assert_eq!(header(Field::Sequence), vec![0x24]);
        assert_eq!(header(Field::Amount), vec![0x61]);
        assert_eq!(header(Field::LimitAmount), vec![0x63]);
        assert_eq!(header(Field::Fee), vec![0x68]);
        assert_eq!(header(Field::SigningPubKey), vec![0x73]);
        assert_eq!(header(Field::TxnSignature), vec![0x74]);
        assert_eq!(header(Field::Domain), vec![0x77]);
        assert_eq!(header(Field::Account), vec![0x81]);
        assert_eq!(header(Field::Destination), vec![0x83]);
        assert_eq!(header(Field::Memo), vec![0xEA]);
        assert_eq!(header(Field::Memos), vec![0xF9]);
    }

    #[test]
    fn two_byte_headers() {
        assert_eq!(header(Field::SetFlag), vec![0x20, 0x21]);
        assert_eq!(header(Field::ClearFlag), vec![0x20, 0x22]);
    }

    #[test]
    fn uncommon_type_headers() {
        let mut out = Vec::new();
        FieldId::new(16, 1).write_header(&mut out);
        assert_eq!(out, vec![0x01, 0x10]);

        out.clear();
        FieldId::new(16, 17).write_header(&mut out);
        assert_eq!(out, vec![0x00, 0x10, 0x11]);
    }

    #[test]
    fn headers_read_back() {
        for id in [
            FieldId::new(1, 2),
            FieldId::new(2, 33),
            FieldId::new(16, 1),
            FieldId::new(16, 17),
        ] {
            let mut out = Vec::new();
            id.write_header(&mut out);
            let mut reader = BinaryReader::new(&out);
            assert_eq!(FieldId::read_header(&mut reader).unwrap(), id);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn canonical_order_is_type_then_field() {
        let mut fields = Field::ALL.to_vec();
        fields.sort_by_key(|f| f.id());
        let names: Vec<_> = fields.iter().map(|f| f.name()).collect();
        assert_eq!(names[..5], ["TransactionType", "Flags", "Sequence", "SetFlag", "ClearFlag"]);
        assert_eq!(names[names.len() - 1], "Memos");
    }

    #[test]
    fn every_field_maps_back_from_its_id() {
        for field in Field::ALL {
            assert_eq!(Field::from_id(field.id()), Some(field));
        }
        assert_eq!(Field::from_id(FieldId::new(5, 5)), None);
    }
}
