//! # Prometheus Metrics
//!
//! Operational metrics for the custody service, scraped at `/metrics` on
//! the metrics port.
//!
//! Everything lives in a dedicated [`prometheus::Registry`] with the
//! `xrpl_custody` prefix, so nothing collides with a default registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use xrpl_custody::CustodyError;

#[derive(Clone)]
pub struct CustodyMetrics {
    registry: Registry,
    /// Signed transactions, labelled by transaction type.
    pub transactions_signed_total: IntCounterVec,
    pub policy_rejections_total: IntCounter,
    pub accounts_created_total: IntCounter,
    /// Failed requests, labelled by error kind.
    pub failed_requests_total: IntCounterVec,
    /// Time from request validation to encoded blob (or engine result).
    pub signing_latency_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(
    registry: &Registry,
    collector: C,
) -> Result<C, prometheus::Error> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl CustodyMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("xrpl_custody".into()), None)?;

        let transactions_signed_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("transactions_signed_total", "Transactions signed, by type"),
                &["kind"],
            )?,
        )?;
        let policy_rejections_total = register(
            &registry,
            IntCounter::new(
                "policy_rejections_total",
                "Payments refused by account transfer policy",
            )?,
        )?;
        let accounts_created_total = register(
            &registry,
            IntCounter::new("accounts_created_total", "Custody accounts created")?,
        )?;
        let failed_requests_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("failed_requests_total", "Failed requests, by error kind"),
                &["error"],
            )?,
        )?;
        let signing_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "signing_latency_seconds",
                    "Signing pipeline latency in seconds",
                )
                .buckets(vec![
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            transactions_signed_total,
            policy_rejections_total,
            accounts_created_total,
            failed_requests_total,
            signing_latency_seconds,
        })
    }

    /// Count a failed request; policy refusals are also counted on their own.
    pub fn record_error(&self, err: &CustodyError) {
        if matches!(err, CustodyError::PolicyViolation { .. }) {
            self.policy_rejections_total.inc();
        }
        self.failed_requests_total
            .with_label_values(&[err.kind()])
            .inc();
    }

    /// Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<CustodyMetrics>;

/// `GET /metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
