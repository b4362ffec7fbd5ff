//! Prometheus exposition of the access layer metrics.
//!
//! Installing the exporter registers a global recorder, describes every
//! metric [`crate::metrics`] emits and serves them as Prometheus text at
//! `http://<bind>/metrics`. Without an exporter the `metrics` macros are
//! no-ops.

use std::net::SocketAddr;

use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::info;

use crate::metrics::{
    METRIC_ERRORS_TOTAL, METRIC_EVENT_RECONNECTS, METRIC_EVENTS_DROPPED, METRIC_EVENTS_RECEIVED,
    METRIC_FAILOVERS_TOTAL, METRIC_LEADER_REFRESH_TOTAL, METRIC_RENEWALS_TOTAL,
    METRIC_REQUEST_DURATION, METRIC_REQUESTS_TOTAL,
};

/// Histogram buckets for request latency, in seconds.
///
/// The upper buckets cover slow checkouts behind a busy leader.
const REQUEST_DURATION_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Handle for an installed exporter.
#[derive(Debug)]
pub struct MetricsExporter {
    bind_addr: SocketAddr,
}

impl MetricsExporter {
    /// Install the global recorder and start serving `/metrics` on `bind_addr`.
    ///
    /// Must run inside a Tokio runtime; the listener is spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsExporterError::InvalidBindAddress`] when `bind_addr`
    /// is not `ip:port`, and [`MetricsExporterError::Install`] when the
    /// listener cannot start or a recorder is already installed.
    pub fn install(bind_addr: &str) -> Result<Self, MetricsExporterError> {
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| MetricsExporterError::InvalidBindAddress(bind_addr.to_string(), e))?;

        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(METRIC_REQUEST_DURATION.to_string()),
                REQUEST_DURATION_BUCKETS,
            )
            .map_err(|e| MetricsExporterError::Install(e.to_string()))?
            .with_http_listener(addr)
            .install()
            .map_err(|e| MetricsExporterError::Install(e.to_string()))?;

        describe_metrics();
        info!(%addr, "Serving Prometheus metrics");

        Ok(Self { bind_addr: addr })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

/// Register HELP text and units with the installed recorder.
fn describe_metrics() {
    describe_histogram!(
        METRIC_REQUEST_DURATION,
        Unit::Seconds,
        "Latency of appliance REST calls by endpoint, method and status"
    );
    describe_counter!(METRIC_REQUESTS_TOTAL, "Appliance REST calls started");
    describe_counter!(METRIC_ERRORS_TOTAL, "Failed appliance REST calls by error category");
    describe_counter!(
        METRIC_FAILOVERS_TOTAL,
        "POST requests retried against the cluster leader"
    );
    describe_counter!(METRIC_LEADER_REFRESH_TOTAL, "Cluster leader lookups by outcome");
    describe_counter!(METRIC_RENEWALS_TOTAL, "Background session renewals by modality and outcome");
    describe_counter!(METRIC_EVENTS_RECEIVED, "Events delivered to the subscriber");
    describe_counter!(
        METRIC_EVENTS_DROPPED,
        "Events discarded because the subscriber queue was full"
    );
    describe_counter!(METRIC_EVENT_RECONNECTS, "Event feed reconnect attempts");
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsExporterError {
    #[error("Invalid bind address '{0}': {1}")]
    InvalidBindAddress(String, std::net::AddrParseError),

    /// Building the recorder, binding the listener or registering it globally failed.
    #[error("Failed to install Prometheus exporter: {0}")]
    Install(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_bind_address() {
        let result = MetricsExporter::install("metrics.local");
        assert!(matches!(
            result,
            Err(MetricsExporterError::InvalidBindAddress(ref addr, _)) if addr == "metrics.local"
        ));
    }

    #[test]
    fn test_buckets_are_sorted() {
        assert!(REQUEST_DURATION_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
