//! Observability infrastructure for the rightsizing engine
//!
//! Provides:
//! - Prometheus metrics (per-signal fetch latency and failures, sample quality, result count)
//! - Structured logging with tracing

use crate::models::{RightsizeParams, RightsizeResult, SignalKind, UnavailableSignal};
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Histogram buckets for backend query latency (in seconds)
const FETCH_LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    fetch_latency_seconds: HistogramVec,
    fetch_failures: IntCounterVec,
    dropped_samples: IntCounterVec,
    duplicate_keys: IntCounterVec,
    results: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram_vec!(
                "rightsize_fetch_latency_seconds",
                "Time spent fetching one signal from the metrics backend",
                &["signal"],
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            fetch_failures: register_int_counter_vec!(
                "rightsize_fetch_failures_total",
                "Signal fetches that failed or timed out",
                &["signal"]
            )
            .expect("Failed to register fetch_failures"),

            dropped_samples: register_int_counter_vec!(
                "rightsize_dropped_samples_total",
                "Malformed result entries dropped by the parser",
                &["signal"]
            )
            .expect("Failed to register dropped_samples"),

            duplicate_keys: register_int_counter_vec!(
                "rightsize_duplicate_keys_total",
                "Samples that overwrote an earlier sample for the same container",
                &["signal"]
            )
            .expect("Failed to register duplicate_keys"),

            results: register_int_gauge!(
                "rightsize_results",
                "Number of recommendations produced by the last run"
            )
            .expect("Failed to register results"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_fetch_latency(&self, signal: SignalKind, duration: Duration) {
        self.inner()
            .fetch_latency_seconds
            .with_label_values(&[signal.label()])
            .observe(duration.as_secs_f64());
    }

    pub fn inc_fetch_failures(&self, signal: SignalKind) {
        self.inner()
            .fetch_failures
            .with_label_values(&[signal.label()])
            .inc();
    }

    pub fn add_dropped_samples(&self, signal: SignalKind, count: usize) {
        self.inner()
            .dropped_samples
            .with_label_values(&[signal.label()])
            .inc_by(count as u64);
    }

    pub fn add_duplicate_keys(&self, signal: SignalKind, count: usize) {
        self.inner()
            .duplicate_keys
            .with_label_values(&[signal.label()])
            .inc_by(count as u64);
    }

    pub fn set_results(&self, count: usize) {
        self.inner().results.set(count as i64);
    }

    /// Render the default registry in the Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for run events
///
/// Keeps field names consistent across the engine and its callers.
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_run_started(&self, params: &RightsizeParams) {
        info!(
            event = "run_started",
            cluster = %self.cluster,
            namespace = %params.namespace,
            window = %params.window,
            oom_window = %params.oom_window,
            target_util = params.target_util,
            safety_factor = params.safety_factor,
            "Rightsizing run started"
        );
    }

    pub fn log_signal_fetched(
        &self,
        signal: SignalKind,
        samples: usize,
        dropped: usize,
        elapsed: Duration,
    ) {
        debug!(
            event = "signal_fetched",
            cluster = %self.cluster,
            signal = %signal,
            samples = samples,
            dropped = dropped,
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetched signal"
        );
    }

    /// A best-effort signal is missing; results are degraded, not wrong
    pub fn log_signal_unavailable(&self, unavailable: &UnavailableSignal) {
        warn!(
            event = "signal_unavailable",
            cluster = %self.cluster,
            signal = %unavailable.signal,
            reason = %unavailable.reason,
            "Optional signal unavailable, treating as no data"
        );
    }

    pub fn log_recommendation(&self, result: &RightsizeResult) {
        debug!(
            event = "recommendation",
            entity = %result.key(),
            mem_p95_ratio = result.mem_p95_ratio,
            cpu_p95_ratio = result.cpu_p95_ratio,
            mem_request_bytes = result.mem_request_bytes,
            mem_recommended_bytes = result.mem_recommended_bytes,
            cpu_request_cores = result.cpu_request_cores,
            cpu_recommended_cores = result.cpu_recommended_cores,
            memory_decision = %result.memory_decision,
            cpu_decision = %result.cpu_decision,
            "Computed recommendation"
        );
    }

    pub fn log_run_completed(&self, results: usize, unavailable: usize, elapsed: Duration) {
        info!(
            event = "run_completed",
            cluster = %self.cluster,
            results = results,
            unavailable_signals = unavailable,
            elapsed_ms = elapsed.as_millis() as u64,
            "Rightsizing run completed"
        );
    }

    pub fn log_run_failed(&self, error: &dyn std::error::Error) {
        warn!(
            event = "run_failed",
            cluster = %self.cluster,
            error = %error,
            "Rightsizing run failed"
        );
    }
}
