//! Amount encoding.
//!
//! ```text
//! native:  0 1 [62-bit drops]                                     8 bytes
//! issued:  1 s [8-bit exponent+97] [54-bit mantissa]              8 bytes
//!          currency code                                          20 bytes
//!          issuer account id                                      20 bytes
//! ```
//!
//! `s` is the sign bit, set for positive values. Issued zero is the special
//! value `0x8000000000000000`.

use super::binary::BinaryReader;
use super::CodecError;
use crate::config::{
    IOU_MAX_EXPONENT, IOU_MAX_MANTISSA, IOU_MIN_EXPONENT, IOU_MIN_MANTISSA, MAX_NATIVE_DROPS,
};
use crate::identity::address::AccountId;
use crate::transaction::types::{Amount, Currency, IssuedValue};

const NOT_NATIVE_BIT: u64 = 0x8000_0000_0000_0000;
const POSITIVE_BIT: u64 = 0x4000_0000_0000_0000;
const NATIVE_VALUE_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;
const MANTISSA_MASK: u64 = (1 << 54) - 1;
const EXPONENT_BIAS: i32 = 97;

pub fn write_amount(amount: &Amount, out: &mut Vec<u8>) -> Result<(), CodecError> {
    match amount {
        Amount::Native(drops) => {
            if *drops > MAX_NATIVE_DROPS {
                return Err(CodecError::InvalidField {
                    field: "Amount",
                    reason: format!("{drops} drops exceeds the native maximum"),
                });
            }
            out.extend_from_slice(&(POSITIVE_BIT | drops).to_be_bytes());
        }
        Amount::Issued {
            value,
            currency,
            issuer,
        } => {
            if currency.is_native() {
                return Err(CodecError::InvalidField {
                    field: "Amount",
                    reason: "issued amount carries the native currency code".into(),
                });
            }
            out.extend_from_slice(&issued_bits(value).to_be_bytes());
            out.extend_from_slice(&currency.to_bytes());
            out.extend_from_slice(issuer.as_bytes());
        }
    }
    Ok(())
}

fn issued_bits(value: &IssuedValue) -> u64 {
    if value.is_zero() {
        return NOT_NATIVE_BIT;
    }
    let sign = if value.is_negative() { 0 } else { POSITIVE_BIT };
    let exponent = (value.exponent() + EXPONENT_BIAS) as u64;
    NOT_NATIVE_BIT | sign | (exponent << 54) | value.mantissa()
}

pub fn read_amount(reader: &mut BinaryReader<'_>) -> Result<Amount, CodecError> {
    let bits = reader.read_u64()?;

    if bits & NOT_NATIVE_BIT == 0 {
        let drops = bits & NATIVE_VALUE_MASK;
        if bits & POSITIVE_BIT == 0 {
            return Err(invalid("native amount without the positive bit"));
        }
        if drops > MAX_NATIVE_DROPS {
            return Err(invalid("native amount exceeds the maximum"));
        }
        return Ok(Amount::Native(drops));
    }

    let currency = Currency::from_bytes(reader.read_array::<20>()?);
    let issuer = AccountId::from_bytes(reader.read_array::<20>()?);
    if currency.is_native() {
        return Err(invalid("issued amount carries the native currency code"));
    }

    let value = if bits == NOT_NATIVE_BIT {
        IssuedValue::ZERO
    } else {
        let negative = bits & POSITIVE_BIT == 0;
        let exponent = ((bits >> 54) & 0xFF) as i32 - EXPONENT_BIAS;
        let mantissa = bits & MANTISSA_MASK;
        if !(IOU_MIN_MANTISSA..=IOU_MAX_MANTISSA).contains(&mantissa) {
            return Err(invalid("issued mantissa is not normalised"));
        }
        if !(IOU_MIN_EXPONENT..=IOU_MAX_EXPONENT).contains(&exponent) {
            return Err(invalid("issued exponent out of range"));
        }
        IssuedValue::from_parts(mantissa, exponent, negative)
    };

    Ok(Amount::Issued {
        value,
        currency,
        issuer,
    })
}

fn invalid(reason: &str) -> CodecError {
    CodecError::InvalidField {
        field: "Amount",
        reason: reason.to_string(),
    }
}
