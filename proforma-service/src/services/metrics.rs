//! Prometheus metrics for proforma-service.
//!
//! Domain counters live in the `prometheus` default registry. HTTP request
//! metrics come from the shared middleware through the `metrics` facade and are
//! rendered by the recorder installed in [`init_metrics`]. `/metrics` serves
//! both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, CounterVec,
    HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Committed sales by document type.
pub static SALES_COMMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "proforma_sales_committed_total",
        "Total number of committed sales",
        &["document_type"] // quote, contract
    )
    .expect("Failed to register sales_committed_total")
});

/// Rejected or failed commits by reason.
pub static COMMIT_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "proforma_commit_failures_total",
        "Total number of failed sale commits by reason",
        &["reason"] // validation, store_retryable, store_outcome_unknown, store_fatal
    )
    .expect("Failed to register commit_failures_total")
});

/// Store call duration by operation.
pub static STORE_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "proforma_store_call_duration_seconds",
        "Record store call duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register store_call_duration")
});

/// Committed sale amount by document type.
pub static SALE_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "proforma_sale_amount_total",
        "Total committed sale amount",
        &["document_type"]
    )
    .expect("Failed to register sale_amount_total")
});

/// Expense rows written or removed.
pub static EXPENSE_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "proforma_expense_events_total",
        "Total number of expense writes by action",
        &["action"] // recorded, deleted
    )
    .expect("Failed to register expense_events_total")
});

/// Recorder for the `metrics` facade; `None` when another recorder was
/// already installed in this process.
static HTTP_METRICS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

fn http_metrics() -> Option<&'static PrometheusHandle> {
    HTTP_METRICS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "HTTP metrics recorder not installed");
                None
            }
        })
        .as_ref()
}

/// Install the HTTP metrics recorder and register domain metrics. Safe to call
/// more than once.
pub fn init_metrics() {
    http_metrics();
    Lazy::force(&SALES_COMMITTED_TOTAL);
    Lazy::force(&COMMIT_FAILURES_TOTAL);
    Lazy::force(&STORE_CALL_DURATION);
    Lazy::force(&SALE_AMOUNT_TOTAL);
    Lazy::force(&EXPENSE_EVENTS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut output = encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default();

    if let Some(handle) = http_metrics() {
        output.push_str(&handle.render());
    }
    output
}
