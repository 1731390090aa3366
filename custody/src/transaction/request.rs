//! Typed signing requests and their validation.
//!
//! Requests arrive as JSON with string-ish fields. Each variant has its own
//! struct, and [`SignRequest::validate`] turns it into a
//! [`ValidatedRequest`] whose addresses, amounts and currencies are already
//! parsed. Nothing downstream of validation handles raw strings except
//! custody account names, which only the service can resolve.

use super::types::{Amount, Currency, IssuedValue, Memo};
use crate::error::{CustodyError, CustodyResult};
use crate::identity::address::AccountId;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Send value from a custody account.
///
/// The destination is either another custody account, by name, or any
/// ledger address. Exactly one of the two must be given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub source: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    pub asset_code: String,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Change account settings. All fields optional; an empty request is
/// accepted and does nothing on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSetRequest {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub set_flag: Option<u32>,
    #[serde(default)]
    pub clear_flag: Option<u32>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Create or change a trust line toward `issuer` for `currency_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustLineRequest {
    #[serde(default)]
    pub account: String,
    pub currency_code: String,
    pub issuer: String,
    #[serde(deserialize_with = "string_or_number")]
    pub limit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignRequest {
    Payment(PaymentRequest),
    AccountSet(AccountSetRequest),
    TrustSet(TrustLineRequest),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Validated form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A custody account, resolved by the service.
    Named(String),
    Address(AccountId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub source: String,
    pub destination: Destination,
    pub amount: Amount,
    /// The integer amount the transfer policy is checked against.
    pub policy_amount: BigUint,
    pub memo: Option<Memo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedRequest {
    Payment(ValidatedPayment),
    AccountSet {
        source: String,
        set_flag: Option<u32>,
        clear_flag: Option<u32>,
        domain: Option<Vec<u8>>,
    },
    TrustSet {
        source: String,
        limit_amount: Amount,
    },
}

impl ValidatedRequest {
    pub fn source(&self) -> &str {
        match self {
            Self::Payment(payment) => &payment.source,
            Self::AccountSet { source, .. } | Self::TrustSet { source, .. } => source,
        }
    }
}

impl SignRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Payment(_) => "Payment",
            Self::AccountSet(_) => "AccountSet",
            Self::TrustSet(_) => "TrustSet",
        }
    }

    pub fn validate(&self) -> CustodyResult<ValidatedRequest> {
        match self {
            Self::Payment(req) => validate_payment(req).map(ValidatedRequest::Payment),
            Self::AccountSet(req) => Ok(ValidatedRequest::AccountSet {
                source: require_name("account", &req.account)?,
                set_flag: req.set_flag,
                clear_flag: req.clear_flag,
                domain: req.domain.as_ref().map(|d| d.as_bytes().to_vec()),
            }),
            Self::TrustSet(req) => validate_trust_line(req),
        }
    }
}

fn require_name(field: &str, value: &str) -> CustodyResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CustodyError::InvalidRequest(format!(
            "missing required field '{field}'"
        )));
    }
    Ok(value.to_string())
}

/// Parse an amount string as an unsigned integer. Zero is not a transfer.
pub fn parse_amount(value: &str) -> CustodyResult<BigUint> {
    let value = value.trim();
    let parsed = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        BigUint::parse_bytes(value.as_bytes(), 10)
    } else {
        None
    };
    let amount = parsed.ok_or_else(|| {
        CustodyError::InvalidAmount(format!("'{value}' is not an unsigned integer"))
    })?;
    if amount.is_zero() {
        return Err(CustodyError::InvalidAmount("amount must be positive".into()));
    }
    Ok(amount)
}

fn validate_payment(req: &PaymentRequest) -> CustodyResult<ValidatedPayment> {
    let source = require_name("source", &req.source)?;

    let destination = match (&req.destination, &req.destination_address) {
        (Some(name), None) => Destination::Named(require_name("destination", name)?),
        (None, Some(address)) => Destination::Address(AccountId::from_address(address)?),
        (None, None) => {
            return Err(CustodyError::InvalidRequest(
                "one of 'destination' or 'destinationAddress' is required".into(),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(CustodyError::InvalidRequest(
                "'destination' and 'destinationAddress' are mutually exclusive".into(),
            ))
        }
    };

    let policy_amount = parse_amount(&req.amount)?;
    let issuer = req
        .asset_issuer
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let amount = match Currency::parse(req.asset_code.trim())? {
        Currency::Native => {
            if issuer.is_some() {
                return Err(CustodyError::InvalidRequest(
                    "the native asset has no issuer".into(),
                ));
            }
            Amount::native(&policy_amount)?
        }
        currency => {
            let issuer = match &req.asset_issuer {
                None => {
                    return Err(CustodyError::InvalidRequest(
                        "'assetIssuer' is required for issued assets".into(),
                    ))
                }
                Some(issuer) => AccountId::from_address(issuer)?,
            };
            Amount::Issued {
                value: IssuedValue::from_integer(&policy_amount)?,
                currency,
                issuer,
            }
        }
    };

    Ok(ValidatedPayment {
        source,
        destination,
        amount,
        policy_amount,
        memo: req.memo.as_deref().map(Memo::text),
    })
}

fn validate_trust_line(req: &TrustLineRequest) -> CustodyResult<ValidatedRequest> {
    let source = require_name("account", &req.account)?;
    let issuer = AccountId::from_address(&req.issuer)?;
    let currency = Currency::parse_issued(req.currency_code.trim())?;

    let notation = format!("{}/{}/{}", req.limit.trim(), currency, issuer);
    let limit_amount = Amount::parse_compound(&notation).map_err(|e| {
        CustodyError::InvalidCurrency(format!("trust line limit '{notation}': {e}"))
    })?;

    Ok(ValidatedRequest::TrustSet {
        source,
        limit_amount,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    fn payment() -> PaymentRequest {
        PaymentRequest {
            source: "alice".into(),
            destination: Some("bob".into()),
            destination_address: None,
            amount: "35".into(),
            asset_code: "XRP".into(),
            asset_issuer: None,
            memo: None,
        }
    }

    fn trust_line(issuer: &str) -> TrustLineRequest {
        TrustLineRequest {
            account: "alice".into(),
            currency_code: "SRC".into(),
            issuer: issuer.into(),
            limit: "1000000".into(),
        }
    }

    #[test]
    fn parses_tagged_json() {
        let json = r#"{"type":"payment","source":"alice","destinationAddress":"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh","amount":35,"assetCode":"native"}"#;
        let request: SignRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.kind(), "Payment");
        let SignRequest::Payment(payment) = &request else {
            panic!("expected a payment");
        };
        assert_eq!(payment.amount, "35");

        let ValidatedRequest::Payment(validated) = request.validate().unwrap() else {
            panic!("expected a payment");
        };
        assert_eq!(validated.amount, Amount::Native(35));
        assert_eq!(
            validated.destination,
            Destination::Address(AccountId::from_address(GENESIS_ADDRESS).unwrap())
        );
    }

    #[test]
    fn native_payment_to_named_account() {
        let ValidatedRequest::Payment(validated) =
            SignRequest::Payment(payment()).validate().unwrap()
        else {
            panic!("expected a payment");
        };
        assert_eq!(validated.source, "alice");
        assert_eq!(validated.destination, Destination::Named("bob".into()));
        assert_eq!(validated.policy_amount, BigUint::from(35u32));
    }

    #[test]
    fn amount_must_be_a_positive_integer() {
        for bad in ["", "-5", "1.5", "abc", "0", " "] {
            let mut req = payment();
            req.amount = bad.into();
            assert!(
                matches!(
                    SignRequest::Payment(req).validate(),
                    Err(CustodyError::InvalidAmount(_))
                ),
                "amount {bad:?}"
            );
        }
    }

    #[test]
    fn native_amount_over_supply_is_invalid() {
        let mut req = payment();
        req.amount = "100000000000000001".into();
        assert!(matches!(
            SignRequest::Payment(req).validate(),
            Err(CustodyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn destination_rules() {
        let mut both = payment();
        both.destination_address = Some(GENESIS_ADDRESS.into());
        assert!(matches!(
            SignRequest::Payment(both).validate(),
            Err(CustodyError::InvalidRequest(_))
        ));

        let mut neither = payment();
        neither.destination = None;
        assert!(matches!(
            SignRequest::Payment(neither).validate(),
            Err(CustodyError::InvalidRequest(_))
        ));

        let mut malformed = payment();
        malformed.destination = None;
        malformed.destination_address = Some("rNotAnAddress".into());
        assert!(matches!(
            SignRequest::Payment(malformed).validate(),
            Err(CustodyError::InvalidAddress(_))
        ));
    }

    #[test]
    fn issued_payment_needs_valid_issuer() {
        let mut req = payment();
        req.asset_code = "USD".into();
        assert!(matches!(
            SignRequest::Payment(req.clone()).validate(),
            Err(CustodyError::InvalidRequest(_))
        ));

        req.asset_issuer = Some(String::new());
        assert!(matches!(
            SignRequest::Payment(req.clone()).validate(),
            Err(CustodyError::InvalidAddress(_))
        ));

        req.asset_issuer = Some(GENESIS_ADDRESS.into());
        let ValidatedRequest::Payment(validated) = SignRequest::Payment(req).validate().unwrap()
        else {
            panic!("expected a payment");
        };
        assert_eq!(validated.amount.currency(), Currency::parse("USD").unwrap());
    }

    #[test]
    fn bad_asset_code_is_invalid_currency() {
        let mut req = payment();
        req.asset_code = "TOOLONG".into();
        assert!(matches!(
            SignRequest::Payment(req).validate(),
            Err(CustodyError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn native_asset_rejects_issuer() {
        let mut req = payment();
        req.asset_issuer = Some(GENESIS_ADDRESS.into());
        assert!(matches!(
            SignRequest::Payment(req).validate(),
            Err(CustodyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn memo_becomes_text_memo() {
        let mut req = payment();
        req.memo = Some("invoice 7".into());
        let ValidatedRequest::Payment(validated) = SignRequest::Payment(req).validate().unwrap()
        else {
            panic!("expected a payment");
        };
        assert_eq!(validated.memo, Some(Memo::text("invoice 7")));
    }

    #[test]
    fn trust_line_with_empty_issuer_is_invalid_address() {
        assert!(matches!(
            SignRequest::TrustSet(trust_line("")).validate(),
            Err(CustodyError::InvalidAddress(_))
        ));
    }

    #[test]
    fn trust_line_composes_compound_limit() {
        let validated = SignRequest::TrustSet(trust_line(GENESIS_ADDRESS))
            .validate()
            .unwrap();
        let ValidatedRequest::TrustSet { limit_amount, .. } = validated else {
            panic!("expected a trust set");
        };
        assert_eq!(
            limit_amount.to_string(),
            format!("1000000/SRC/{GENESIS_ADDRESS}")
        );
    }

    #[test]
    fn trust_line_bad_currency_or_limit_is_invalid_currency() {
        let mut req = trust_line(GENESIS_ADDRESS);
        req.currency_code = "XRP".into();
        assert!(matches!(
            SignRequest::TrustSet(req).validate(),
            Err(CustodyError::InvalidCurrency(_))
        ));

        let mut req = trust_line(GENESIS_ADDRESS);
        req.limit = "lots".into();
        assert!(matches!(
            SignRequest::TrustSet(req).validate(),
            Err(CustodyError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn account_set_needs_an_account_name() {
        let req = AccountSetRequest {
            domain: Some("example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            SignRequest::AccountSet(req).validate(),
            Err(CustodyError::InvalidRequest(_))
        ));

        let req = AccountSetRequest {
            account: "alice".into(),
            domain: Some("example.com".into()),
            ..Default::default()
        };
        let ValidatedRequest::AccountSet { domain, .. } =
            SignRequest::AccountSet(req).validate().unwrap()
        else {
            panic!("expected an account set");
        };
        assert_eq!(domain.as_deref(), Some(&b"example.com"[..]));
    }
}
