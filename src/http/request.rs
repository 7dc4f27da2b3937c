//! Request identification and per-request context.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID unless the client supplied one
//! - Echo the ID back in the response headers
//! - Carry the request's execution context to handlers
//!
//! # Design Decisions
//! - Request ID added as early as possible so spans and logs can carry it

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use opentelemetry::Context;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID header, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Execution context of the current request, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestContext(pub Context);
