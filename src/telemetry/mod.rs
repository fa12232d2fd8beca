//! Logging, tracing and metrics setup.
//!
//! Always installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`
//! (falling back to the configured level). When an OTLP endpoint is
//! configured, spans, metrics and log events are also exported there.

pub mod lease;
pub mod metrics;

use crate::error::{Error, Result};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Optional OTLP gRPC endpoint (e.g. "http://localhost:4317").
    pub endpoint: Option<String>,
    /// The service name reported in telemetry signals.
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "leaseq=debug").
    pub log_level: String,
}

/// Keeps the OTel pipelines alive; flushes and shuts them down on drop.
#[derive(Default)]
pub struct TelemetryGuard {
    providers: Option<Providers>,
}

struct Providers {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    logger: SdkLoggerProvider,
}

impl TelemetryGuard {
    /// Whether OTLP export is active.
    pub fn is_exporting(&self) -> bool {
        self.providers.is_some()
    }

    /// Force-flush all pipelines. No-op without an OTLP endpoint.
    pub fn force_flush(&self) {
        if let Some(p) = &self.providers {
            let _ = p.tracer.force_flush();
            let _ = p.meter.force_flush();
            let _ = p.logger.force_flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(p) = self.providers.take() {
            let _ = p.logger.shutdown();
            let _ = p.meter.shutdown();
            let _ = p.tracer.shutdown();
        }
    }
}

/// Initialize the global tracing subscriber and, optionally, OTLP export.
///
/// Returns a guard that must be held for the lifetime of the process.
///
/// # Errors
///
/// Fails if an OTLP exporter cannot be built or a global subscriber is
/// already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact());

    let Some(endpoint) = config.endpoint else {
        registry
            .try_init()
            .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;
        return Ok(TelemetryGuard::default());
    };

    let resource = Resource::builder()
        .with_service_name(config.service_name)
        .build();
    let providers = build_providers(&endpoint, resource)?;
    opentelemetry::global::set_meter_provider(providers.meter.clone());

    let trace_layer =
        tracing_opentelemetry::layer().with_tracer(providers.tracer.tracer("leaseq"));
    let log_layer = opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(
        &providers.logger,
    );

    registry
        .with(trace_layer)
        .with(log_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;

    Ok(TelemetryGuard {
        providers: Some(providers),
    })
}

fn build_providers(endpoint: &str, resource: Resource) -> Result<Providers> {
    use opentelemetry_otlp::{LogExporter, MetricExporter, SpanExporter, WithExportConfig as _};

    let spans = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_err("span", e))?;
    let metrics = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_err("metric", e))?;
    let logs = LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_err("log", e))?;

    Ok(Providers {
        tracer: SdkTracerProvider::builder()
            .with_batch_exporter(spans)
            .with_resource(resource.clone())
            .build(),
        meter: SdkMeterProvider::builder()
            .with_periodic_exporter(metrics)
            .with_resource(resource.clone())
            .build(),
        logger: SdkLoggerProvider::builder()
            .with_batch_exporter(logs)
            .with_resource(resource)
            .build(),
    })
}

fn exporter_err(signal: &str, e: impl std::fmt::Display) -> Error {
    Error::Other(format!("failed to create OTLP {signal} exporter: {e}"))
}
