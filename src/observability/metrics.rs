//! Request duration histogram.
//!
//! # Responsibilities
//! - Capture a start marker when a request arrives
//! - Record elapsed milliseconds once the response has been fully sent
//! - Aggregate samples per tag set (route, method, status code)
//! - Mirror every sample into the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `http.server.duration` (histogram, ms): tagged `route`, `method`, `status_code`
//!
//! # Design Decisions
//! - `RequestTimer` is consumed by `on_request_finish`, so a request can be
//!   recorded at most once
//! - Series live in a `DashMap`; recording never blocks other series
//! - Bucket boundaries follow the OpenTelemetry defaults

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Serialize;

pub const HTTP_SERVER_DURATION: &str = "http.server.duration";

/// Upper bucket bounds in milliseconds; a final overflow bucket is implied.
pub const DEFAULT_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0,
];

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    metrics::describe_histogram!(
        HTTP_SERVER_DURATION,
        metrics::Unit::Milliseconds,
        "Measures HTTP request durations"
    );
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Dimensions of one histogram series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequestTags {
    pub route: String,
    pub method: String,
    pub status_code: u16,
}

/// Start marker for one request.
#[derive(Debug)]
#[must_use = "a request timer records nothing until passed to on_request_finish"]
pub struct RequestTimer {
    start: Instant,
}

/// Aggregated samples of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramPoint {
    pub tags: RequestTags,
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    /// One count per boundary plus the overflow bucket.
    pub bucket_counts: Vec<u64>,
}

impl HistogramPoint {
    fn empty(tags: RequestTags) -> Self {
        Self {
            tags,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            bucket_counts: vec![0; DEFAULT_BOUNDARIES.len() + 1],
        }
    }

    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let bucket = DEFAULT_BOUNDARIES
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(DEFAULT_BOUNDARIES.len());
        self.bucket_counts[bucket] += 1;
    }
}

/// Process-wide request duration histogram. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct DurationHistogram {
    series: Arc<DashMap<RequestTags, HistogramPoint>>,
}

impl DurationHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request_start(&self) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
        }
    }

    /// Record the time elapsed since `timer` was taken.
    pub fn on_request_finish(&self, timer: RequestTimer, tags: RequestTags) {
        let elapsed_ms = timer.start.elapsed().as_secs_f64() * 1000.0;
        self.record(elapsed_ms, tags);
    }

    pub fn record(&self, elapsed_ms: f64, tags: RequestTags) {
        metrics::histogram!(
            HTTP_SERVER_DURATION,
            "route" => tags.route.clone(),
            "method" => tags.method.clone(),
            "status_code" => tags.status_code.to_string()
        )
        .record(elapsed_ms);

        let key = tags.clone();
        self.series
            .entry(key)
            .or_insert_with(|| HistogramPoint::empty(tags))
            .record(elapsed_ms);
    }

    pub fn snapshot(&self) -> Vec<HistogramPoint> {
        self.series.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Total samples across all series.
    pub fn sample_count(&self) -> u64 {
        self.series.iter().map(|entry| entry.value().count).sum()
    }
}
