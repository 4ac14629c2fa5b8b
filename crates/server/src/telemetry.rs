//! Structured logging and Prometheus metrics.
//!
//! [`PrometheusMetrics`] is the server's [`SearchMetrics`] observer: every
//! pipeline stage reports a latency histogram and an outcome counter, which
//! `/metrics` renders in the Prometheus text format.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use prodsearch::{SearchMetrics, SearchTier};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const RETRIEVAL_SECONDS: &str = "prodsearch_retrieval_duration_seconds";
pub const RETRIEVAL_TOTAL: &str = "prodsearch_retrieval_total";
pub const COUNT_SECONDS: &str = "prodsearch_count_duration_seconds";
pub const COUNT_TOTAL: &str = "prodsearch_count_total";
pub const REQUEST_SECONDS: &str = "prodsearch_search_duration_seconds";
pub const REQUEST_TOTAL: &str = "prodsearch_search_requests_total";

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install JSON logging filtered by `log_level` (any `EnvFilter` directive).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init();
}

/// Handle to the process-wide Prometheus recorder, installing it on first use.
///
/// If some other recorder already owns the global slot, the handle renders a
/// detached (empty) registry instead of failing.
pub fn prometheus_handle() -> PrometheusHandle {
    PROMETHEUS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "prometheus recorder not installed");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

/// [`SearchMetrics`] backed by the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl SearchMetrics for PrometheusMetrics {
    fn record_retrieval(&self, tier: SearchTier, latency: Duration, ok: bool) {
        metrics::histogram!(RETRIEVAL_SECONDS, "tier" => tier.as_str()).record(latency.as_secs_f64());
        metrics::counter!(RETRIEVAL_TOTAL, "tier" => tier.as_str(), "outcome" => outcome(ok)).increment(1);
    }

    fn record_count(&self, latency: Duration, ok: bool) {
        metrics::histogram!(COUNT_SECONDS).record(latency.as_secs_f64());
        metrics::counter!(COUNT_TOTAL, "outcome" => outcome(ok)).increment(1);
    }

    fn record_request(&self, latency: Duration, ok: bool) {
        metrics::histogram!(REQUEST_SECONDS).record(latency.as_secs_f64());
        metrics::counter!(REQUEST_TOTAL, "outcome" => outcome(ok)).increment(1);
    }
}
