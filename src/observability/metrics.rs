use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::debug;
use std::sync::Arc;
use tokio::sync::OnceCell;

static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide client metrics.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        debug!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Request metrics
    pub api_requests: IntCounterVec,
    pub api_request_failures: IntCounterVec,
    pub api_request_duration: HistogramVec,

    // Token lifecycle
    pub token_refreshes: IntCounterVec,

    // Log streaming
    pub stream_entries: IntCounter,
    pub stream_parse_failures: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("deployaja".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Requests
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "API requests by method and response status"),&["method", "status"],).unwrap(),
            api_request_failures: IntCounterVec::new(Opts::new("api_request_failures_total", "API request failures by reason"),&["method", "reason"],).unwrap(),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "API request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),&["method"],).unwrap(),

            // Token lifecycle
            token_refreshes: IntCounterVec::new(Opts::new("token_refreshes_total", "Token refresh attempts by outcome"),&["outcome"],).unwrap(),

            // Streaming
            stream_entries: IntCounter::new("stream_entries_total", "Log entries received over the event stream").unwrap(),
            stream_parse_failures: IntCounter::new("stream_parse_failures_total", "Event stream lines that failed to decode").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_failures.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.stream_entries.clone())).unwrap();
        reg.register(Box::new(metrics.stream_parse_failures.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        match encoder.encode(&metric_families, &mut buffer) {
            Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(err) => format!("# failed to encode metrics: {err}\n"),
        }
    }
}
