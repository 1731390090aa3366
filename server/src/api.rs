//! # REST API
//!
//! The axum router that maps HTTP calls onto [`CustodyService`]. Handlers
//! are thin: parse the body, call the service, count the outcome, map the
//! error to a status code.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                       |
//! |--------|-------------------------------|-----------------------------------|
//! | GET    | `/health`                     | Liveness check                    |
//! | GET    | `/accounts`                   | Names of all custody accounts     |
//! | POST   | `/accounts/:name`             | Create (and optionally fund)      |
//! | GET    | `/accounts/:name`             | Public view of one account        |
//! | POST   | `/accounts/:name/accountset`  | Sign an AccountSet                |
//! | POST   | `/accounts/:name/trustline`   | Sign a TrustSet                   |
//! | POST   | `/payments`                   | Sign a Payment                    |
//! | POST   | `/submit`                     | Forward an already-signed blob    |
//!
//! Signing endpoints accept `"submit": true` to submit while the account's
//! sequence lease is still held.
//!
//! ## Errors
//!
//! | Error                                    | Status |
//! |------------------------------------------|--------|
//! | invalid address/amount/currency/request  | 400    |
//! | policy violation                         | 403    |
//! | account not found                        | 404    |
//! | ledger network unavailable               | 502    |
//! | key derivation, signing, encoding, store | 500    |

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use xrpl_custody::transaction::{AccountSetRequest, PaymentRequest, SignRequest, TrustLineRequest};
use xrpl_custody::{CreateAccountRequest, CustodyError, CustodyService};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CustodyService>,
    pub metrics: SharedMetrics,
    /// "mainnet", "testnet" or "devnet".
    pub network: String,
    pub version: String,
}

impl AppState {
    /// Count `err` and wrap it for the response.
    fn reject(&self, err: CustodyError) -> ApiError {
        self.metrics.record_error(&err);
        ApiError(err)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/accounts", get(list_accounts_handler))
        .route(
            "/accounts/:name",
            get(read_account_handler).post(create_account_handler),
        )
        .route("/accounts/:name/accountset", post(account_set_handler))
        .route("/accounts/:name/trustline", post(trust_line_handler))
        .route("/payments", post(payment_handler))
        .route("/submit", post(submit_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub network: String,
    pub version: String,
    /// RFC 3339.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountListResponse {
    pub accounts: Vec<String>,
}

/// Body keys no field claimed. serde cannot combine `flatten` with
/// `deny_unknown_fields`, so the leftovers are collected here and refused
/// by the handler.
type UnknownFields = BTreeMap<String, serde_json::Value>;

fn reject_unknown_fields(unknown: &UnknownFields) -> Result<(), CustodyError> {
    match unknown.keys().next() {
        Some(field) => Err(CustodyError::InvalidRequest(format!(
            "unknown field '{field}'"
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    #[serde(flatten)]
    pub payment: PaymentRequest,
    #[serde(default)]
    pub submit: bool,
    #[serde(flatten)]
    unknown: UnknownFields,
}

/// `account` comes from the path; a value in the body is overwritten.
#[derive(Debug, Deserialize)]
pub struct AccountSetBody {
    #[serde(flatten)]
    pub settings: AccountSetRequest,
    #[serde(default)]
    pub submit: bool,
    #[serde(flatten)]
    unknown: UnknownFields,
}

#[derive(Debug, Deserialize)]
pub struct TrustLineBody {
    #[serde(flatten)]
    pub trust_line: TrustLineRequest,
    #[serde(default)]
    pub submit: bool,
    #[serde(flatten)]
    unknown: UnknownFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub tx_blob: String,
    #[serde(flatten)]
    unknown: UnknownFields,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable label, e.g. `policy_violation`.
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError(pub CustodyError);

pub fn status_for(err: &CustodyError) -> StatusCode {
    match err {
        CustodyError::InvalidAddress(_)
        | CustodyError::InvalidAmount(_)
        | CustodyError::InvalidCurrency(_)
        | CustodyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        CustodyError::PolicyViolation { .. } => StatusCode::FORBIDDEN,
        CustodyError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        CustodyError::NetworkUnavailable(_) => StatusCode::BAD_GATEWAY,
        CustodyError::KeyDerivation(_)
        | CustodyError::Signing(_)
        | CustodyError::Encoding(_)
        | CustodyError::Storage(_)
        | CustodyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "request failed");
        } else {
            tracing::debug!(error = %self.0, kind = self.0.kind(), "request rejected");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Does not touch the ledger or the store.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        network: state.network.clone(),
        version: state.version.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn list_accounts_handler(
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let accounts = state
        .service
        .list_accounts()
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(AccountListResponse { accounts }))
}

/// `POST /accounts/:name`. An empty body creates an unrestricted, unfunded
/// account.
async fn create_account_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateAccountRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            state.reject(CustodyError::InvalidRequest(format!("malformed body: {e}")))
        })?
    };

    let view = state
        .service
        .create_account(&name, request)
        .await
        .map_err(|e| state.reject(e))?;
    state.metrics.accounts_created_total.inc();
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn read_account_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let view = state
        .service
        .read_account(&name)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(view).into_response())
}

async fn account_set_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<AccountSetBody>,
) -> Result<Response, ApiError> {
    reject_unknown_fields(&body.unknown).map_err(|e| state.reject(e))?;
    let mut settings = body.settings;
    settings.account = name;
    run_signing(&state, SignRequest::AccountSet(settings), body.submit).await
}

async fn trust_line_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<TrustLineBody>,
) -> Result<Response, ApiError> {
    reject_unknown_fields(&body.unknown).map_err(|e| state.reject(e))?;
    let mut trust_line = body.trust_line;
    trust_line.account = name;
    run_signing(&state, SignRequest::TrustSet(trust_line), body.submit).await
}

async fn payment_handler(
    State(state): State<AppState>,
    Json(body): Json<PaymentBody>,
) -> Result<Response, ApiError> {
    reject_unknown_fields(&body.unknown).map_err(|e| state.reject(e))?;
    run_signing(&state, SignRequest::Payment(body.payment), body.submit).await
}

async fn submit_handler(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> Result<Response, ApiError> {
    reject_unknown_fields(&body.unknown).map_err(|e| state.reject(e))?;
    let result = state
        .service
        .submit(&body.tx_blob)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(result).into_response())
}

/// Sign (and maybe submit) `request`, timing the pipeline and counting the
/// outcome.
async fn run_signing(state: &AppState, request: SignRequest, submit: bool) -> Result<Response, ApiError> {
    let kind = request.kind();
    let timer = state.metrics.signing_latency_seconds.start_timer();
    let outcome = if submit {
        state
            .service
            .sign_and_submit(request)
            .await
            .map(|submitted| Json(submitted).into_response())
    } else {
        state
            .service
            .sign(request)
            .await
            .map(|signed| Json(signed).into_response())
    };
    timer.observe_duration();

    let response = outcome.map_err(|e| state.reject(e))?;
    state
        .metrics
        .transactions_signed_total
        .with_label_values(&[kind])
        .inc();
    Ok(response)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
