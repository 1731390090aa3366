//! Core type definitions for custody transactions.
//!
//! These types form the vocabulary of every transaction we sign: which
//! ledger transaction it is, where it is in its lifecycle, and how much of
//! what it moves. Amounts never touch floating point. Native amounts are
//! integer drops; issued amounts are the ledger's own decimal
//! mantissa/exponent pair, normalised exactly the way the ledger does it.

use crate::config::{
    IOU_MAX_EXPONENT, IOU_MAX_MANTISSA, IOU_MIN_EXPONENT, IOU_MIN_MANTISSA, MAX_NATIVE_DROPS,
    MEMO_TYPE_TEXT, NATIVE_ASSET_ALIAS, NATIVE_CURRENCY,
};
use crate::error::{CustodyError, CustodyResult};
use crate::identity::address::AccountId;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// The three ledger transaction types a custody account can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Value transfer to another account.
    Payment,
    /// Account settings change: flags and domain.
    AccountSet,
    /// Create or modify a trust line to an issuer.
    TrustSet,
}

impl TransactionType {
    /// The ledger's `TransactionType` field value.
    pub fn code(self) -> u16 {
        match self {
            Self::Payment => 0,
            Self::AccountSet => 3,
            Self::TrustSet => 20,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Payment),
            3 => Some(Self::AccountSet),
            20 => Some(Self::TrustSet),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Payment => "Payment",
            Self::AccountSet => "AccountSet",
            Self::TrustSet => "TrustSet",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// TransactionState
// ---------------------------------------------------------------------------

/// Where a transaction is in the signing pipeline.
///
/// ```text
/// Draft -> Populated -> SequenceAssigned -> Signed -> Encoded
///   any state -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    Draft,
    Populated,
    SequenceAssigned,
    Signed,
    Encoded,
    Failed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// A currency as the ledger sees it: native XRP, or a 160-bit issued code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Native,
    Issued([u8; 20]),
}

const STANDARD_CODE_SYMBOLS: &str = "?!@#$%^&*<>(){}[]|";

impl Currency {
    /// Parse an asset code, accepting the native asset under either its
    /// ticker or the `native` alias.
    pub fn parse(code: &str) -> CustodyResult<Self> {
        if code == NATIVE_CURRENCY || code.eq_ignore_ascii_case(NATIVE_ASSET_ALIAS) {
            return Ok(Self::Native);
        }
        Self::parse_issued(code)
    }

    /// Parse an issued-currency code: three ASCII characters, or 40 hex
    /// digits for a non-standard code. `XRP` is not an issued currency.
    pub fn parse_issued(code: &str) -> CustodyResult<Self> {
        if code.is_empty() {
            return Err(CustodyError::InvalidCurrency("currency code is empty".into()));
        }
        if code == NATIVE_CURRENCY {
            return Err(CustodyError::InvalidCurrency(format!(
                "{NATIVE_CURRENCY} cannot be used as an issued currency code"
            )));
        }

        if code.len() == 3 {
            let valid = code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || STANDARD_CODE_SYMBOLS.contains(c));
            if !valid {
                return Err(CustodyError::InvalidCurrency(format!(
                    "'{code}' contains characters not allowed in a currency code"
                )));
            }
            let mut bytes = [0u8; 20];
            bytes[12..15].copy_from_slice(code.as_bytes());
            return Ok(Self::Issued(bytes));
        }

        if code.len() == 40 {
            let decoded = hex::decode(code).map_err(|_| {
                CustodyError::InvalidCurrency(format!("'{code}' is not a hex currency code"))
            })?;
            if decoded[0] == 0 {
                return Err(CustodyError::InvalidCurrency(format!(
                    "non-standard currency code '{code}' must not start with 0x00"
                )));
            }
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&decoded);
            return Ok(Self::Issued(bytes));
        }

        Err(CustodyError::InvalidCurrency(format!(
            "'{code}' is neither a 3-character nor a 40-hex-digit currency code"
        )))
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        match self {
            Self::Native => [0u8; 20],
            Self::Issued(bytes) => *bytes,
        }
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        if bytes == [0u8; 20] {
            Self::Native
        } else {
            Self::Issued(bytes)
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_CURRENCY),
            Self::Issued(bytes) if bytes[0] == 0 => {
                f.write_str(&String::from_utf8_lossy(&bytes[12..15]))
            }
            Self::Issued(bytes) => f.write_str(&hex::encode_upper(bytes)),
        }
    }
}

// ---------------------------------------------------------------------------
// IssuedValue
// ---------------------------------------------------------------------------

/// A normalised issued-currency quantity: `mantissa * 10^exponent`.
///
/// Non-zero values always have a mantissa in `[10^15, 10^16)` and an exponent
/// in `[-96, 80]`; zero is mantissa 0. Anything that cannot be represented
/// exactly is rejected instead of rounded; a custodian that silently rounds
/// a customer's trust limit is a custodian with a support queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssuedValue {
    mantissa: u64,
    exponent: i32,
    negative: bool,
}

impl IssuedValue {
    pub const ZERO: Self = Self {
        mantissa: 0,
        exponent: 0,
        negative: false,
    };

    /// Rebuild from wire parts; the codec guarantees they are normalised.
    pub(crate) fn from_parts(mantissa: u64, exponent: i32, negative: bool) -> Self {
        if mantissa == 0 {
            return Self::ZERO;
        }
        Self {
            mantissa,
            exponent,
            negative,
        }
    }

    pub fn from_integer(value: &BigUint) -> CustodyResult<Self> {
        Self::normalize(value.clone(), 0)
    }

    /// Parse an unsigned decimal such as `1000000` or `12.5`.
    pub fn from_decimal(value: &str) -> CustodyResult<Self> {
        let invalid = || CustodyError::InvalidAmount(format!("'{value}' is not a valid decimal"));

        let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part}");
        let mantissa = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
        let exponent = -i32::try_from(frac_part.len()).map_err(|_| invalid())?;
        Self::normalize(mantissa, exponent)
    }

    fn normalize(mut mantissa: BigUint, mut exponent: i32) -> CustodyResult<Self> {
        if mantissa.is_zero() {
            return Ok(Self::ZERO);
        }

        let ten = BigUint::from(10u32);
        let max = BigUint::from(IOU_MAX_MANTISSA);
        while mantissa > max {
            if !(&mantissa % &ten).is_zero() {
                return Err(CustodyError::InvalidAmount(
                    "issued amount has more than 16 significant digits".into(),
                ));
            }
            mantissa /= &ten;
            exponent = exponent.saturating_add(1);
        }

        let mut mantissa = mantissa
            .to_u64()
            .ok_or_else(|| CustodyError::InvalidAmount("issued amount out of range".into()))?;
        while mantissa < IOU_MIN_MANTISSA {
            mantissa *= 10;
            exponent = exponent.saturating_sub(1);
        }

        if exponent > IOU_MAX_EXPONENT {
            return Err(CustodyError::InvalidAmount("issued amount is too large".into()));
        }
        if exponent < IOU_MIN_EXPONENT {
            return Err(CustodyError::InvalidAmount("issued amount is too small".into()));
        }

        Ok(Self {
            mantissa,
            exponent,
            negative: false,
        })
    }

    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }
}

impl fmt::Display for IssuedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa == 0 {
            return f.write_str("0");
        }

        let mut mantissa = self.mantissa;
        let mut exponent = self.exponent;
        while mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }

        let sign = if self.negative { "-" } else { "" };
        let digits = mantissa.to_string();
        if exponent >= 0 {
            return write!(f, "{sign}{digits}{}", "0".repeat(exponent as usize));
        }

        let point = digits.len() as i32 + exponent;
        if point > 0 {
            let (whole, frac) = digits.split_at(point as usize);
            write!(f, "{sign}{whole}.{frac}")
        } else {
            write!(f, "{sign}0.{}{digits}", "0".repeat((-point) as usize))
        }
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A ledger amount: native drops, or an issued value with its currency and
/// issuer.
///
/// Renders in the compound notation `value/CUR/issuer` (`value/XRP` for
/// native), which is also what [`Amount::parse_compound`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Amount {
    Native(u64),
    Issued {
        value: IssuedValue,
        currency: Currency,
        issuer: AccountId,
    },
}

impl Amount {
    /// Native amount in drops, capped at the ledger's maximum supply.
    pub fn native(drops: &BigUint) -> CustodyResult<Self> {
        let drops = drops
            .to_u64()
            .filter(|d| *d <= MAX_NATIVE_DROPS)
            .ok_or_else(|| {
                CustodyError::InvalidAmount(format!(
                    "native amount exceeds the maximum of {MAX_NATIVE_DROPS} drops"
                ))
            })?;
        Ok(Self::Native(drops))
    }

    /// Parse `value/XRP` or `value/CUR/issuer`.
    pub fn parse_compound(notation: &str) -> CustodyResult<Self> {
        let malformed = || {
            CustodyError::InvalidCurrency(format!("'{notation}' is not a valid compound amount"))
        };

        let parts: Vec<&str> = notation.split('/').collect();
        match parts.as_slice() {
            [value, code] if Currency::parse(code)? == Currency::Native => {
                let drops = BigUint::parse_bytes(value.as_bytes(), 10)
                    .filter(|_| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
                    .ok_or_else(|| {
                        CustodyError::InvalidAmount(format!("'{value}' is not a drop amount"))
                    })?;
                Self::native(&drops)
            }
            [value, code, issuer] => {
                let currency = Currency::parse_issued(code)?;
                let issuer = AccountId::from_address(issuer).map_err(|_| malformed())?;
                Ok(Self::Issued {
                    value: IssuedValue::from_decimal(value)?,
                    currency,
                    issuer,
                })
            }
            _ => Err(malformed()),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    pub fn currency(&self) -> Currency {
        match self {
            Self::Native(_) => Currency::Native,
            Self::Issued { currency, .. } => *currency,
        }
    }

    pub fn drops(&self) -> Option<u64> {
        match self {
            Self::Native(drops) => Some(*drops),
            Self::Issued { .. } => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(drops) => write!(f, "{drops}/{NATIVE_CURRENCY}"),
            Self::Issued {
                value,
                currency,
                issuer,
            } => write!(f, "{value}/{currency}/{issuer}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Memo
// ---------------------------------------------------------------------------

/// Arbitrary data attached to a transaction. All three parts are optional
/// blobs; by convention the type and format are MIME-ish strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Memo {
    pub memo_type: Option<Vec<u8>>,
    pub memo_data: Option<Vec<u8>>,
    pub memo_format: Option<Vec<u8>>,
}

impl Memo {
    /// A plain-text memo.
    pub fn text(text: &str) -> Self {
        Self {
            memo_type: Some(MEMO_TYPE_TEXT.as_bytes().to_vec()),
            memo_data: Some(text.as_bytes().to_vec()),
            memo_format: None,
        }
    }

    /// Size of `MemoData`, the figure memo limits apply to. The type and
    /// format tags are not counted.
    pub fn data_len(&self) -> usize {
        self.memo_data.as_ref().map_or(0, Vec::len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
