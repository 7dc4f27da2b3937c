//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request path produces:
//!     → trace.rs (spans started against an explicit parent Context)
//!     → metrics.rs (request duration histogram)
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → SdkTracerProvider batch processor → stdout / in-memory exporter
//!     → Metrics endpoint (Prometheus scrape, optional)
//!     → stdout logs
//! ```
//!
//! # Design Decisions
//! - `Telemetry` is built explicitly at startup and passed to handlers;
//!   no global tracer provider or propagator is installed
//! - Context (active span + baggage) is passed as a value, never attached
//! - Telemetry never fails a request: the batch processor drops spans when
//!   its queue is full and swallows exporter errors

pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod trace;

use std::collections::BTreeMap;

use opentelemetry::baggage::{Baggage, BaggageExt};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, SdkTracer, SdkTracerProvider, SpanExporter,
};
use opentelemetry_sdk::Resource;

use crate::config::{ObservabilityConfig, SpanExporterKind};

pub use self::metrics::{DurationHistogram, RequestTags, RequestTimer};

/// Instrumentation scope name of the service's own spans.
pub const TRACER_NAME: &str = "dice-server";

/// Process-wide telemetry state: tracer provider, histogram and base context.
pub struct Telemetry {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    http_duration: DurationHistogram,
    resource: Resource,
    base_context: Context,
}

impl Telemetry {
    /// Build telemetry using the exporter selected in `config`.
    pub fn from_config(config: &ObservabilityConfig) -> Self {
        match config.span_exporter {
            SpanExporterKind::Console => {
                Self::with_exporter(config, opentelemetry_stdout::SpanExporter::default())
            }
            SpanExporterKind::None => Self::assemble(config, None),
        }
    }

    /// Build telemetry exporting spans to `exporter` through a batch processor
    /// bounded by `export_queue_capacity`.
    pub fn with_exporter<E>(config: &ObservabilityConfig, exporter: E) -> Self
    where
        E: SpanExporter + 'static,
    {
        let batch = BatchConfigBuilder::default()
            .with_max_queue_size(config.export_queue_capacity)
            .build();
        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(batch)
            .build();
        Self::assemble(config, Some(processor))
    }

    fn assemble(config: &ObservabilityConfig, processor: Option<BatchSpanProcessor>) -> Self {
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attribute(KeyValue::new(
                "service.version",
                config.service_version.clone(),
            ))
            .build();

        let mut builder = SdkTracerProvider::builder().with_resource(resource.clone());
        if let Some(processor) = processor {
            builder = builder.with_span_processor(processor);
        }
        let provider = builder.build();
        let tracer = provider.tracer(TRACER_NAME);

        tracing::debug!(
            service_name = %config.service_name,
            service_version = %config.service_version,
            exporter = ?config.span_exporter,
            baggage = ?config.baggage,
            "Telemetry initialized"
        );

        Self {
            provider,
            tracer,
            http_duration: DurationHistogram::new(),
            resource,
            base_context: base_context(&config.baggage),
        }
    }

    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    pub fn http_duration(&self) -> &DurationHistogram {
        &self.http_duration
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Context every request derives from; carries the process baggage.
    pub fn base_context(&self) -> &Context {
        &self.base_context
    }

    /// Export every span ended so far.
    pub async fn flush(&self) {
        let provider = self.provider.clone();
        match tokio::task::spawn_blocking(move || provider.force_flush()).await {
            Ok(Ok(())) => tracing::debug!("Spans flushed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Span flush failed"),
            Err(e) => tracing::warn!(error = %e, "Span flush task failed"),
        }
    }

    /// Flush queued spans and stop the export thread.
    pub async fn shutdown(&self) {
        let provider = self.provider.clone();
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => tracing::info!("Telemetry flushed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Telemetry shutdown failed"),
            Err(e) => tracing::warn!(error = %e, "Telemetry shutdown task failed"),
        }
    }
}

/// Root context carrying `entries` as baggage.
pub fn base_context(entries: &BTreeMap<String, String>) -> Context {
    let mut baggage = Baggage::new();
    for (key, value) in entries {
        baggage.insert(key.clone(), value.clone());
    }
    Context::new().with_baggage(baggage)
}
