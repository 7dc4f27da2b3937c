//! Router-level tests for `GET /rolldice` and its telemetry.

use axum::http::{HeaderValue, Method, StatusCode};
use dice_server::dice::service::{ROLL_EVENT, ROLL_SPAN, SETUP_SPAN};
use dice_server::http::middleware::UNMATCHED_ROUTE;
use dice_server::http::X_REQUEST_ID;
use futures_util::future::join_all;
use http_body_util::BodyExt;
use opentelemetry::trace::SpanKind;
use opentelemetry::Value;
use opentelemetry_sdk::trace::InMemorySpanExporter;
use tower::ServiceExt;

mod common;

use common::{attribute, span_named};

#[tokio::test]
async fn test_rolldice_returns_die_face() {
    let (server, _telemetry) = common::build_server(InMemorySpanExporter::default());

    let response = server.router().oneshot(common::get("/rolldice")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: i64 = std::str::from_utf8(&body).unwrap().parse().unwrap();
    assert!((1..=6).contains(&value), "got {value}");
}

#[tokio::test]
async fn test_concurrent_requests_record_one_sample_each() {
    let (server, telemetry) = common::build_server(InMemorySpanExporter::default());
    let router = server.router();

    let requests = (0..100).map(|_| {
        let router = router.clone();
        async move {
            let response = router.oneshot(common::get("/rolldice")).await.unwrap();
            let status = response.status();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            (status, String::from_utf8(body.to_vec()).unwrap())
        }
    });
    let results = join_all(requests).await;

    assert_eq!(results.len(), 100);
    for (status, body) in &results {
        assert_eq!(*status, StatusCode::OK);
        assert!(["1", "2", "3", "4", "5", "6"].contains(&body.as_str()), "got {body:?}");
    }

    let histogram = telemetry.http_duration();
    assert_eq!(histogram.sample_count(), 100);
    let points = histogram.snapshot();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].tags.route, "/rolldice");
    assert_eq!(points[0].tags.method, "GET");
    assert_eq!(points[0].tags.status_code, 200);
    assert!(points[0].min >= 0.0);
}

#[tokio::test]
async fn test_request_spans_are_correlated() {
    let exporter = InMemorySpanExporter::default();
    let (server, telemetry) = common::build_server(exporter.clone());

    let response = server.router().oneshot(common::get("/rolldice")).await.unwrap();
    let request_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_owned();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: i64 = std::str::from_utf8(&body).unwrap().parse().unwrap();

    let spans = common::finished_spans(&telemetry, &exporter).await;
    assert_eq!(spans.len(), 3);
    let setup = span_named(&spans, SETUP_SPAN);
    let server_span = span_named(&spans, "GET /rolldice");
    let roll = span_named(&spans, ROLL_SPAN);

    assert_eq!(server_span.span_kind, SpanKind::Server);
    assert_eq!(
        attribute(server_span, "http.response.status_code"),
        Some(&Value::I64(200))
    );
    assert_eq!(
        attribute(server_span, "http.route").map(|v| v.as_str().into_owned()),
        Some("/rolldice".to_string())
    );
    assert_eq!(
        attribute(server_span, "http.request_id").map(|v| v.as_str().into_owned()),
        Some(request_id)
    );

    assert_eq!(roll.span_kind, SpanKind::Internal);
    assert_eq!(roll.span_context.trace_id(), server_span.span_context.trace_id());
    assert_eq!(roll.parent_span_id, server_span.span_context.span_id());
    assert_eq!(attribute(roll, "dice.value"), Some(&Value::I64(value)));
    assert_eq!(roll.events.events[0].name, ROLL_EVENT);

    assert_eq!(roll.links.links.len(), 1);
    assert_eq!(roll.links.links[0].span_context, setup.span_context);
    assert_ne!(setup.span_context.trace_id(), roll.span_context.trace_id());

    for span in &spans {
        assert!(span.end_time >= span.start_time);
    }
}

#[tokio::test]
async fn test_traceparent_continues_remote_trace() {
    let exporter = InMemorySpanExporter::default();
    let (server, telemetry) = common::build_server(exporter.clone());

    let mut request = common::get("/rolldice");
    request.headers_mut().insert(
        "traceparent",
        HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
    );
    let response = server.router().oneshot(request).await.unwrap();
    response.into_body().collect().await.unwrap();

    let spans = common::finished_spans(&telemetry, &exporter).await;
    let server_span = span_named(&spans, "GET /rolldice");
    assert_eq!(
        server_span.span_context.trace_id().to_string(),
        "4bf92f3577b34da6a3ce929d0e0e4736"
    );
    assert_eq!(server_span.parent_span_id.to_string(), "00f067aa0ba902b7");
}

#[tokio::test]
async fn test_client_request_id_is_echoed() {
    let (server, _telemetry) = common::build_server(InMemorySpanExporter::default());

    let mut request = common::get("/rolldice");
    request
        .headers_mut()
        .insert(X_REQUEST_ID, HeaderValue::from_static("req-42"));
    let response = server.router().oneshot(request).await.unwrap();

    assert_eq!(response.headers()[X_REQUEST_ID], "req-42");
}

#[tokio::test]
async fn test_unknown_route_is_timed_and_traced() {
    let exporter = InMemorySpanExporter::default();
    let (server, telemetry) = common::build_server(exporter.clone());

    let response = server.router().oneshot(common::get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    response.into_body().collect().await.unwrap();

    let points = telemetry.http_duration().snapshot();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].tags.route, UNMATCHED_ROUTE);
    assert_eq!(points[0].tags.status_code, 404);

    let spans = common::finished_spans(&telemetry, &exporter).await;
    assert!(spans.iter().all(|s| s.name != ROLL_SPAN));
    let server_span = span_named(&spans, "GET");
    assert_eq!(
        attribute(server_span, "http.response.status_code"),
        Some(&Value::I64(404))
    );
    assert_eq!(
        attribute(server_span, "url.path").map(|v| v.as_str().into_owned()),
        Some("/nope".to_string())
    );
    assert!(attribute(server_span, "http.route").is_none());
}

#[tokio::test]
async fn test_distinct_unknown_paths_share_one_series() {
    let (server, telemetry) = common::build_server(InMemorySpanExporter::default());
    let router = server.router();

    let requests = (0..1000).map(|i| {
        let router = router.clone();
        async move {
            let response = router
                .oneshot(common::get(&format!("/junk/{i}")))
                .await
                .unwrap();
            response.into_body().collect().await.unwrap();
        }
    });
    join_all(requests).await;

    let response = router.oneshot(common::get("/rolldice")).await.unwrap();
    response.into_body().collect().await.unwrap();

    let histogram = telemetry.http_duration();
    assert_eq!(histogram.sample_count(), 1001);
    let points = histogram.snapshot();
    assert!(points.len() <= 2, "series = {}", points.len());
    let unmatched = points
        .iter()
        .find(|p| p.tags.route == UNMATCHED_ROUTE)
        .expect("unmatched series");
    assert_eq!(unmatched.count, 1000);
}

#[tokio::test]
async fn test_custom_methods_share_one_series() {
    let (server, telemetry) = common::build_server(InMemorySpanExporter::default());
    let router = server.router();

    for method in ["BREW", "WHEN", "PROPFIND"] {
        let mut request = common::get("/rolldice");
        *request.method_mut() = Method::from_bytes(method.as_bytes()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        response.into_body().collect().await.unwrap();
    }

    let points = telemetry.http_duration().snapshot();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].tags.method, "_OTHER");
    assert_eq!(points[0].count, 3);
}
