//! Test-network faucet.
//!
//! `POST {faucet}/accounts` with no body creates and funds a throwaway
//! account and answers with its address and secret. The service then pays
//! from that account into the freshly created custody account, which is
//! how new accounts get their reserve on testnet and devnet.

use super::LedgerError;
use crate::crypto::secret::SecretString;
use crate::identity::address::AccountId;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::info;
use zeroize::{Zeroize, Zeroizing};

pub struct FaucetClient {
    http: reqwest::Client,
    url: String,
}

/// A funded account handed out by the faucet.
pub struct FaucetAccount {
    pub address: AccountId,
    pub secret: SecretString,
}

impl fmt::Debug for FaucetAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaucetAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct FaucetResponse {
    account: FaucetResponseAccount,
}

/// Older faucets send `address` and `secret`, newer ones `classicAddress`
/// and `seed`, and some send both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaucetResponseAccount {
    address: Option<String>,
    classic_address: Option<String>,
    secret: Option<String>,
    seed: Option<String>,
}

impl Drop for FaucetResponseAccount {
    fn drop(&mut self) {
        self.secret.zeroize();
        self.seed.zeroize();
    }
}

impl FaucetClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub async fn generate_account(&self) -> Result<FaucetAccount, LedgerError> {
        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Timeout
                } else {
                    LedgerError::Faucet(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LedgerError::Faucet(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body = Zeroizing::new(
            response
                .text()
                .await
                .map_err(|e| LedgerError::Faucet(e.to_string()))?,
        );
        let account = parse_faucet_response(&body)?;
        info!(address = %account.address, "faucet generated funding account");
        Ok(account)
    }
}

pub(crate) fn parse_faucet_response(body: &str) -> Result<FaucetAccount, LedgerError> {
    let parsed: FaucetResponse =
        serde_json::from_str(body).map_err(|e| LedgerError::MalformedResponse(e.to_string()))?;
    let mut account = parsed.account;
    let address = account
        .classic_address
        .take()
        .or_else(|| account.address.take())
        .ok_or_else(|| LedgerError::MalformedResponse("faucet sent no address".into()))?;
    let secret = account
        .seed
        .take()
        .or_else(|| account.secret.take())
        .map(SecretString::new)
        .ok_or_else(|| LedgerError::MalformedResponse("faucet sent no secret".into()))?;
    let address =
        AccountId::from_address(&address).map_err(|e| LedgerError::Faucet(e.to_string()))?;
    Ok(FaucetAccount { address, secret })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    #[test]
    fn classic_faucet_response() {
        let body = format!(
            r#"{{"account":{{"address":"{GENESIS_ADDRESS}","secret":"snoPBrXtMeMyMHUVTgbuqAfg1SUTb"}},"balance":1000}}"#
        );
        let account = parse_faucet_response(&body).unwrap();
        assert_eq!(account.address.to_address(), GENESIS_ADDRESS);
        assert_eq!(account.secret.expose_secret(), "snoPBrXtMeMyMHUVTgbuqAfg1SUTb");
    }

    #[test]
    fn newer_faucet_response_uses_seed() {
        let body = format!(
            r#"{{"account":{{"classicAddress":"{GENESIS_ADDRESS}","seed":"snoPBrXtMeMyMHUVTgbuqAfg1SUTb"}},"amount":10}}"#
        );
        assert!(parse_faucet_response(&body).is_ok());
    }

    #[test]
    fn seed_wins_when_both_secrets_are_sent() {
        let body = format!(
            r#"{{"account":{{"address":"{GENESIS_ADDRESS}","secret":"sOld","seed":"snoPBrXtMeMyMHUVTgbuqAfg1SUTb"}}}}"#
        );
        let account = parse_faucet_response(&body).unwrap();
        assert_eq!(account.secret.expose_secret(), "snoPBrXtMeMyMHUVTgbuqAfg1SUTb");
    }

    #[test]
    fn debug_hides_the_secret() {
        let body = format!(
            r#"{{"account":{{"address":"{GENESIS_ADDRESS}","secret":"snoPBrXtMeMyMHUVTgbuqAfg1SUTb"}}}}"#
        );
        let account = parse_faucet_response(&body).unwrap();
        assert!(!format!("{account:?}").contains("snoP"));
    }

    #[test]
    fn bad_address_is_a_faucet_error() {
        let body = r#"{"account":{"address":"nope","secret":"s"}}"#;
        assert!(matches!(
            parse_faucet_response(body),
            Err(LedgerError::Faucet(_))
        ));
    }
}
