//! JSON-RPC client for a rippled node.
//!
//! Two methods, both POSTed as `{"method": ..., "params": [{...}]}`:
//!
//! - `account_info` against the `current` (open) ledger, so the sequence
//!   reflects transactions submitted but not yet validated;
//! - `submit` with the uppercase-hex `tx_blob`.
//!
//! rippled reports most failures inside a `200 OK` body with
//! `"status": "error"`, so the HTTP status alone proves very little.

use super::{LedgerClient, LedgerError, SubmitResult};
use crate::identity::address::AccountId;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct JsonRpcLedgerClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: Value,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    account_data: AccountData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccountData {
    sequence: u32,
}

#[derive(Debug, Deserialize)]
struct RawSubmitResult {
    engine_result: String,
    engine_result_code: i32,
    #[serde(default)]
    engine_result_message: String,
}

impl JsonRpcLedgerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        debug!(method, url = %self.url, "ledger rpc call");
        let body = json!({ "method": method, "params": [params] });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?;
        Ok(envelope.result)
    }
}

fn map_transport(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout
    } else {
        LedgerError::Transport(err.to_string())
    }
}

/// `Some((code, message))` when rippled answered with an error status.
fn rpc_error(result: &Value) -> Option<(String, String)> {
    if result.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let code = result
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = result
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}

pub(crate) fn parse_account_info(result: Value, account: &AccountId) -> Result<u32, LedgerError> {
    if let Some((code, message)) = rpc_error(&result) {
        return Err(match code.as_str() {
            "actNotFound" => LedgerError::AccountNotFound(account.to_address()),
            _ => LedgerError::Rpc(format!("{code}: {message}")),
        });
    }
    let info: AccountInfo = serde_json::from_value(result)
        .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?;
    Ok(info.account_data.sequence)
}

pub(crate) fn parse_submit(result: Value) -> Result<SubmitResult, LedgerError> {
    if let Some((code, message)) = rpc_error(&result) {
        return Err(LedgerError::Rpc(format!("{code}: {message}")));
    }
    let raw: RawSubmitResult = serde_json::from_value(result)
        .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?;
    Ok(SubmitResult {
        engine_result: raw.engine_result,
        engine_result_code: raw.engine_result_code,
        engine_result_message: raw.engine_result_message,
    })
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn fetch_sequence(&self, account: &AccountId) -> Result<u32, LedgerError> {
        let params = json!({
            "account": account.to_address(),
            "ledger_index": "current",
        });
        let result = self.call("account_info", params).await?;
        parse_account_info(result, account)
    }

    async fn submit(&self, tx_blob: &[u8]) -> Result<SubmitResult, LedgerError> {
        let params = json!({ "tx_blob": hex::encode_upper(tx_blob) });
        let result = self.call("submit", params).await?;
        parse_submit(result)
    }
}
