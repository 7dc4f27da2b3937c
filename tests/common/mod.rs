//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use dice_server::config::ServiceConfig;
use dice_server::http::HttpServer;
use dice_server::lifecycle::Shutdown;
use dice_server::observability::Telemetry;
use opentelemetry::Value;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData, SpanExporter};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Default config bound to loopback with a short request timeout.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.timeouts.request_secs = 5;
    config
}

/// Build telemetry and an in-process server around `exporter`.
pub fn build_server<E: SpanExporter + 'static>(exporter: E) -> (HttpServer, Arc<Telemetry>) {
    build_server_with(test_config(), exporter)
}

pub fn build_server_with<E: SpanExporter + 'static>(
    config: ServiceConfig,
    exporter: E,
) -> (HttpServer, Arc<Telemetry>) {
    let telemetry = Arc::new(Telemetry::with_exporter(&config.observability, exporter));
    let server = HttpServer::new(config, telemetry.clone());
    (server, telemetry)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

/// Flush `telemetry` and return everything `exporter` has received.
pub async fn finished_spans(telemetry: &Telemetry, exporter: &InMemorySpanExporter) -> Vec<SpanData> {
    telemetry.flush().await;
    exporter.get_finished_spans().expect("in-memory exporter readable")
}

pub fn attribute<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value)
}

/// Find a span by name, panicking with the available names otherwise.
pub fn span_named<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans.iter().find(|s| s.name == name).unwrap_or_else(|| {
        let names: Vec<_> = spans.iter().map(|s| s.name.as_ref()).collect();
        panic!("no span named {name:?}; have {names:?}")
    })
}

/// A server bound to an ephemeral local port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub telemetry: Arc<Telemetry>,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningServer {
    pub async fn start<E: SpanExporter + 'static>(exporter: E) -> Self {
        let (server, telemetry) = build_server(exporter);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
        Self {
            addr,
            telemetry,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown, wait for the server to drain and flush telemetry.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
        self.telemetry.flush().await;
    }
}
