//! Metrics collection for the access layer.
//!
//! This module records, through the `metrics` crate:
//! - Request latency histograms and request counters
//! - Errors by category
//! - POST failovers, leader refreshes, session renewals and event delivery
//!
//! # What this module does NOT handle:
//! - Metrics exposition/export (see [`crate::metrics_exporter`])
//!
//! # Invariants
//! - Label names are consistent: `endpoint`, `method`, `status`, `error_category`,
//!   `modality`, `outcome`
//! - Recording is infallible and a no-op when the collector is disabled
//! - Zero-cost when no metrics recorder is installed

use crate::error::{ClientError, ErrorKind};
use std::time::Duration;

/// Metric name for request duration histogram.
pub const METRIC_REQUEST_DURATION: &str = "safeguard_api_request_duration_seconds";

/// Metric name for total request counter.
pub const METRIC_REQUESTS_TOTAL: &str = "safeguard_api_requests_total";

/// Metric name for error counter.
pub const METRIC_ERRORS_TOTAL: &str = "safeguard_api_errors_total";

/// Metric name for POST read-to-write failovers.
pub const METRIC_FAILOVERS_TOTAL: &str = "safeguard_api_failovers_total";

/// Metric name for cluster leader refreshes.
pub const METRIC_LEADER_REFRESH_TOTAL: &str = "safeguard_leader_refresh_total";

/// Metric name for session renewals.
pub const METRIC_RENEWALS_TOTAL: &str = "safeguard_session_renewals_total";

/// Metric name for delivered events.
pub const METRIC_EVENTS_RECEIVED: &str = "safeguard_events_received_total";

/// Metric name for events dropped because the queue was full.
pub const METRIC_EVENTS_DROPPED: &str = "safeguard_events_dropped_total";

/// Metric name for event stream reconnects.
pub const METRIC_EVENT_RECONNECTS: &str = "safeguard_event_reconnects_total";

/// Error categories for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level errors (connection refused, DNS, etc.)
    Transport,
    /// HTTP 4xx client errors
    Http4xx,
    /// HTTP 5xx server errors
    Http5xx,
    /// Authentication failures
    Auth,
    /// Deadline elapsed
    Timeout,
    /// TLS, URL or certificate configuration errors
    Config,
    /// Unknown/unclassified errors
    Unknown,
}

impl ErrorCategory {
    /// Returns the string label for this error category.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Http4xx => "http_4xx",
            ErrorCategory::Http5xx => "http_5xx",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Config => "config",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl From<&ClientError> for ErrorCategory {
    fn from(error: &ClientError) -> Self {
        if let ClientError::ApiError { status, .. } = error {
            return match status {
                400..=499 => ErrorCategory::Http4xx,
                500..=599 => ErrorCategory::Http5xx,
                _ => ErrorCategory::Unknown,
            };
        }
        match error.kind() {
            ErrorKind::Transport => ErrorCategory::Transport,
            ErrorKind::Authentication => ErrorCategory::Auth,
            ErrorKind::Timeout => ErrorCategory::Timeout,
            ErrorKind::Configuration => ErrorCategory::Config,
            ErrorKind::Protocol | ErrorKind::State | ErrorKind::Cancelled => ErrorCategory::Unknown,
        }
    }
}

/// Metrics collector for the access layer.
///
/// A thin wrapper around the `metrics` macros with consistent labels.
///
/// # Example
///
/// ```rust,ignore
/// use safeguard_client::metrics::MetricsCollector;
///
/// let collector = MetricsCollector::new();
/// collector.record_request_duration("AccessRequests", "GET", Duration::from_millis(150), Some(200));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    enabled: bool,
}

impl MetricsCollector {
    /// Create an enabled collector.
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a collector that records nothing.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the duration of an API request.
    ///
    /// `status` is `None` when the request failed before a response arrived.
    pub fn record_request_duration(
        &self,
        endpoint: &str,
        method: &str,
        duration: Duration,
        status: Option<u16>,
    ) {
        if !self.enabled {
            return;
        }

        let status_label = status.map_or("error".to_string(), |s| s.to_string());

        metrics::histogram!(METRIC_REQUEST_DURATION,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
            "status" => status_label,
        )
        .record(duration.as_secs_f64());
    }

    /// Record a request attempt, including the failover attempt.
    pub fn record_request(&self, endpoint: &str, method: &str) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_REQUESTS_TOTAL,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
        )
        .increment(1);
    }

    /// Record an error from a ClientError.
    pub fn record_client_error(&self, endpoint: &str, method: &str, error: &ClientError) {
        if !self.enabled {
            return;
        }

        metrics::counter!(METRIC_ERRORS_TOTAL,
            "endpoint" => endpoint.to_string(),
            "method" => method.to_string(),
            "error_category" => ErrorCategory::from(error).as_str(),
        )
        .increment(1);
    }

    /// Record a POST retried against the write origin.
    pub fn record_failover(&self, endpoint: &str) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_FAILOVERS_TOTAL, "endpoint" => endpoint.to_string()).increment(1);
    }

    /// Record a cluster leader lookup.
    pub fn record_leader_refresh(&self, success: bool) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_LEADER_REFRESH_TOTAL, "outcome" => outcome(success)).increment(1);
    }

    /// Record a background renewal attempt.
    pub fn record_renewal(&self, modality: &'static str, success: bool) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_RENEWALS_TOTAL,
            "modality" => modality,
            "outcome" => outcome(success),
        )
        .increment(1);
    }

    pub fn record_event_received(&self) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_EVENTS_RECEIVED).increment(1);
    }

    pub fn record_event_dropped(&self) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_EVENTS_DROPPED).increment(1);
    }

    pub fn record_event_reconnect(&self) {
        if !self.enabled {
            return;
        }
        metrics::counter!(METRIC_EVENT_RECONNECTS).increment(1);
    }
}

fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}
