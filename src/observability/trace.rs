//! Span helpers over the OpenTelemetry tracer.
//!
//! Spans are always started against an explicit parent [`Context`]; nothing
//! here reads or attaches the thread's current context.

use std::borrow::Cow;
use std::fmt::Display;

use opentelemetry::trace::{SpanBuilder, Status, TraceContextExt, Tracer as _};
use opentelemetry::Context;
use opentelemetry_sdk::trace::SdkTracer;

/// Start a span as a child of `parent`.
///
/// Returns a context derived from `parent` with the new span active. The
/// parent's baggage is carried over unchanged.
pub fn begin(tracer: &SdkTracer, builder: SpanBuilder, parent: &Context) -> Context {
    let span = tracer.build_with_context(builder, parent);
    parent.with_span(span)
}

/// Run `f` inside a span that is ended on every exit path.
///
/// An `Err` result marks the span with an error status before it ends.
/// A panic unwinds through the span's `Drop`, which ends it as well.
pub fn in_span<T, E, F>(
    tracer: &SdkTracer,
    builder: SpanBuilder,
    parent: &Context,
    f: F,
) -> Result<T, E>
where
    E: Display,
    F: FnOnce(&Context) -> Result<T, E>,
{
    let cx = begin(tracer, builder, parent);
    let result = f(&cx);
    let span = cx.span();
    if let Err(e) = &result {
        span.set_status(Status::error(e.to_string()));
    }
    span.end();
    result
}

/// Add an event to the active span of `cx`.
///
/// An ended span keeps its finalized data; the event is dropped with a warning.
pub fn record_event(cx: &Context, name: impl Into<Cow<'static, str>>) {
    let span = cx.span();
    let name = name.into();
    if !span.is_recording() {
        tracing::warn!(
            event = %name,
            span_id = %span.span_context().span_id(),
            "Event on a span that is not recording"
        );
        return;
    }
    span.add_event(name, Vec::new());
}
