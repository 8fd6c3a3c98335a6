use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to build prometheus exporter: {0}")]
    Exporter(String),
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("Metrics are not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Which side of the connection caused a failed inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Client,
    Server,
}

impl ExceptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionKind::Client => "client",
            ExceptionKind::Server => "server",
        }
    }
}

/// Process-wide inference counters, exported in the Prometheus text format.
pub struct Metrics {
    request_counter: Counter<u64>,
    exception_counter: Counter<u64>,
    latency: Histogram<f64>,
    registry: Registry,
    _provider: SdkMeterProvider,
}

impl Metrics {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        // TODO: opentelemetry-prometheus is deprecated, move to an OTLP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

        let provider = SdkMeterProvider::builder().with_reader(exporter).build();

        let meter = provider.meter("classifier_service");
        global::set_meter_provider(provider.clone());

        let request_counter = meter
            .u64_counter("inference_requests")
            .with_description("Total number of inference requests")
            .build();

        let exception_counter = meter
            .u64_counter("inference_exceptions")
            .with_description("Total number of inference exceptions")
            .build();

        let latency = meter
            .f64_histogram("inference_latency_seconds")
            .with_boundaries(latency_boundaries())
            .with_description("Inference request latency in seconds")
            .build();

        Ok(Metrics {
            request_counter,
            exception_counter,
            latency,
            registry,
            _provider: provider,
        })
    }

    pub fn record_request(&self) {
        self.request_counter.add(1, &[]);
    }

    pub fn record_exception(&self, kind: ExceptionKind) {
        let attributes = [KeyValue::new("kind", kind.as_str())];
        self.exception_counter.add(1, &attributes);
    }

    pub fn record_latency(&self, seconds: f64) {
        self.latency.record(seconds, &[]);
    }

    pub fn scrape(&self) -> Result<String, TelemetryError> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

/// Bucket bounds in seconds, the Prometheus client defaults.
fn latency_boundaries() -> Vec<f64> {
    vec![
        0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
    ]
}
