//! Log and trace setup for binaries embedding the access layer.
//!
//! Installs one global `tracing` subscriber made of an env filter, an
//! optional stderr log layer (plain or JSON) and an optional OTLP span
//! exporter. Outgoing appliance requests carry the current span as a W3C
//! `traceparent` header.
//!
//! Invariants:
//! - Logs never go to stdout; commands own stdout.
//! - `init` may only succeed once per process.
//!
//! ```rust,ignore
//! use safeguard_client::TracingConfig;
//!
//! let guard = TracingConfig::new()
//!     .with_otlp_endpoint("http://localhost:4317")
//!     .with_service_name("safeguard-cli")
//!     .init()?;
//! // ...
//! guard.shutdown();
//! ```

use std::time::Duration;

use opentelemetry::propagation::{Injector, TextMapPropagator};
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming the OTLP collector endpoint.
pub const OTLP_ENDPOINT_ENV_VAR: &str = "SAFEGUARD_OTLP_ENDPOINT";

/// Environment variable switching stderr logs to JSON lines.
pub const LOG_FORMAT_ENV_VAR: &str = "SAFEGUARD_LOG_FORMAT";

/// Instrumentation scope reported on exported spans.
const TRACER_SCOPE: &str = "safeguard-client";

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// OTLP gRPC endpoint, e.g. `http://localhost:4317`. `None` disables export.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub service_version: String,
    /// Write human-readable or JSON logs to stderr.
    pub log_to_stderr: bool,
    pub json_logs: bool,
    /// Deadline for each OTLP export call.
    pub export_timeout: Duration,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: std::env::var(OTLP_ENDPOINT_ENV_VAR).ok(),
            service_name: TRACER_SCOPE.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_to_stderr: true,
            json_logs: std::env::var(LOG_FORMAT_ENV_VAR)
                .is_ok_and(|v| v.eq_ignore_ascii_case("json")),
            export_timeout: Duration::from_secs(5),
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_stderr_logs(mut self, enable: bool) -> Self {
        self.log_to_stderr = enable;
        self
    }

    pub fn with_json_logs(mut self, enable: bool) -> Self {
        self.json_logs = enable;
        self
    }

    /// Install the global subscriber.
    ///
    /// `RUST_LOG` selects levels; without it everything at `info` and above
    /// is kept. Hold the returned guard until exit and call
    /// [`TracingGuard::shutdown`] so buffered spans are flushed.
    ///
    /// # Errors
    ///
    /// [`TracingError::Exporter`] when the OTLP pipeline cannot be built,
    /// [`TracingError::AlreadyInstalled`] when a global subscriber exists.
    pub fn init(&self) -> Result<TracingGuard, TracingError> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let provider = self
            .otlp_endpoint
            .as_deref()
            .map(|endpoint| self.tracer_provider(endpoint))
            .transpose()?;
        let otel_layer = provider
            .as_ref()
            .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(TRACER_SCOPE)));

        let plain_layer = (self.log_to_stderr && !self.json_logs)
            .then(|| fmt::layer().with_writer(std::io::stderr));
        let json_layer = (self.log_to_stderr && self.json_logs)
            .then(|| fmt::layer().json().with_writer(std::io::stderr));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(otel_layer)
            .with(plain_layer)
            .with(json_layer)
            .try_init()
            .map_err(|e| TracingError::AlreadyInstalled(e.to_string()))?;

        Ok(TracingGuard { provider })
    }

    fn tracer_provider(&self, endpoint: &str) -> Result<SdkTracerProvider, TracingError> {
        use opentelemetry_otlp::{Protocol, WithExportConfig};
        use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler};

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .with_timeout(self.export_timeout)
            .with_protocol(Protocol::Grpc)
            .build()
            .map_err(|e| TracingError::Exporter(e.to_string()))?;

        let resource = opentelemetry_sdk::Resource::builder()
            .with_service_name(self.service_name.clone())
            .with_attribute(opentelemetry::KeyValue::new(
                "service.version",
                self.service_version.clone(),
            ))
            .build();

        Ok(SdkTracerProvider::builder()
            .with_span_processor(BatchSpanProcessor::builder(exporter).build())
            .with_resource(resource)
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
            .build())
    }
}

/// Keeps the span exporter alive.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    /// Flush buffered spans and stop the exporter.
    pub fn shutdown(&self) {
        if let Some(provider) = &self.provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to flush traces: {e}");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to build OTLP exporter: {0}")]
    Exporter(String),

    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Writes propagation fields into an outgoing header map.
struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Add the current span's W3C trace context to `headers`.
///
/// Adds nothing when the current span is not sampled by an OTLP layer.
pub fn inject_trace_context(headers: &mut HeaderMap) {
    let context = tracing::Span::current().context();
    TraceContextPropagator::new().inject_context(&context, &mut HeaderInjector(headers));
}
