//! Request telemetry middleware.
//!
//! # Responsibilities
//! - Start the duration timer as soon as the request arrives
//! - Continue the caller's trace and open a SERVER span around the handler
//! - Hand the request context to handlers via a request extension
//! - Record the duration sample once the response body has been fully sent
//!
//! # Design Decisions
//! - The histogram sample is edge-triggered by the response body reaching its
//!   end; a body dropped early (client abort) records nothing
//! - The server span ends when the handler returns, before the body is sent
//! - Histogram tags use the matched route template and a fixed method set,
//!   so clients cannot mint new series with arbitrary paths

use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer as _};
use opentelemetry::KeyValue;

use crate::http::request::{request_id, RequestContext};
use crate::http::server::AppState;
use crate::observability::{propagation, trace, RequestTags};

/// Route label of requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "unknown";

/// Method label of requests using a non-standard method.
pub const OTHER_METHOD: &str = "_OTHER";

/// Route template of the request, or [`UNMATCHED_ROUTE`].
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::HEAD => "HEAD",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::CONNECT => "CONNECT",
        Method::OPTIONS => "OPTIONS",
        Method::TRACE => "TRACE",
        Method::PATCH => "PATCH",
        _ => OTHER_METHOD,
    }
}

/// Times, traces and tags every request.
pub async fn request_telemetry(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let telemetry = &state.telemetry;
    let timer = telemetry.http_duration().on_request_start();

    let method = method_label(request.method());
    let route = route_label(&request);
    let matched = route != UNMATCHED_ROUTE;
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_owned();
    let parent = propagation::extract(request.headers(), telemetry.base_context());

    let name = if matched {
        format!("{method} {route}")
    } else {
        method.to_string()
    };
    let mut attributes = vec![
        KeyValue::new("http.request.method", method),
        KeyValue::new("url.path", path.clone()),
        KeyValue::new("http.request_id", request_id.clone()),
    ];
    if matched {
        attributes.push(KeyValue::new("http.route", route.clone()));
    }
    let tracer = telemetry.tracer();
    let builder = tracer
        .span_builder(name)
        .with_kind(SpanKind::Server)
        .with_attributes(attributes);
    let cx = trace::begin(tracer, builder, &parent);
    request.extensions_mut().insert(RequestContext(cx.clone()));

    let response = next.run(request).await;

    let status = response.status();
    let span = cx.span();
    span.set_attribute(KeyValue::new(
        "http.response.status_code",
        i64::from(status.as_u16()),
    ));
    if status.is_server_error() {
        span.set_status(Status::error(status.to_string()));
    }
    span.end();

    tracing::debug!(
        request_id = %request_id,
        method,
        path = %path,
        route = %route,
        status = status.as_u16(),
        trace_id = %span.span_context().trace_id(),
        "Request handled"
    );

    let histogram = telemetry.http_duration().clone();
    let tags = RequestTags {
        route,
        method: method.to_string(),
        status_code: status.as_u16(),
    };
    let (parts, body) = response.into_parts();
    let body = CompletionBody::new(body, move || histogram.on_request_finish(timer, tags));
    Response::from_parts(parts, Body::new(body))
}

/// Response body that runs a callback once it has been fully delivered.
pub struct CompletionBody {
    inner: Body,
    on_complete: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl CompletionBody {
    pub fn new<F>(inner: Body, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    fn complete(&mut self) {
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
    }
}

impl HttpBody for CompletionBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        let finished = match &polled {
            Poll::Ready(None) => true,
            Poll::Ready(Some(Ok(_))) => self.inner.is_end_stream(),
            _ => false,
        };
        if finished {
            self.complete();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CompletionBody {
    fn drop(&mut self) {
        // Transports skip polling bodies that are already at end of stream.
        if self.inner.is_end_stream() {
            self.complete();
        }
    }
}
