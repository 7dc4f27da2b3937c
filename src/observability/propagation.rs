//! W3C trace context extraction.
//!
//! Continues a caller's trace from the `traceparent` header and adds the
//! caller's `baggage` header entries on top of the local baggage. Malformed
//! headers are ignored rather than rejected.

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};

/// Propagator for the `traceparent`, `tracestate` and `baggage` headers.
pub fn propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// Derive a request context from `base` and the incoming headers.
pub fn extract(headers: &HeaderMap, base: &Context) -> Context {
    propagator().extract_with_context(base, &HeaderExtractor(headers))
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}
