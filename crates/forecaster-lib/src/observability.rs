//! Observability infrastructure for the forecaster
//!
//! Provides:
//! - Prometheus self-metrics (pass latency, fit latency, publish and fallback counts)
//! - Structured JSON logging with tracing

use crate::models::LabelSet;
use crate::predictor::FallbackReason;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Buckets for a single model fit (seconds)
const FIT_LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Buckets for a full pass over every metric (seconds)
const PASS_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

static GLOBAL_METRICS: OnceLock<ForecasterMetricsInner> = OnceLock::new();

struct ForecasterMetricsInner {
    pass_latency_seconds: Histogram,
    fit_latency_seconds: Histogram,
    forecasts_published: IntCounter,
    fallbacks: IntCounterVec,
    source_errors: IntCounter,
    publish_errors: IntCounter,
    series_processed: IntCounter,
    last_pass_timestamp: IntGauge,
}

impl ForecasterMetricsInner {
    fn new() -> Self {
        Self {
            pass_latency_seconds: register_histogram!(
                "cadvisor_forecaster_pass_latency_seconds",
                "Time spent on one pass over every configured metric",
                PASS_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_latency_seconds"),

            fit_latency_seconds: register_histogram!(
                "cadvisor_forecaster_fit_latency_seconds",
                "Time spent fitting and predicting a single series",
                FIT_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fit_latency_seconds"),

            forecasts_published: register_int_counter!(
                "cadvisor_forecaster_forecasts_published_total",
                "Forecasts accepted by the sink"
            )
            .expect("Failed to register forecasts_published"),

            fallbacks: register_int_counter_vec!(
                "cadvisor_forecaster_fallbacks_total",
                "Forecasts replaced by the neutral default",
                &["reason"]
            )
            .expect("Failed to register fallbacks"),

            source_errors: register_int_counter!(
                "cadvisor_forecaster_source_errors_total",
                "Range queries that failed"
            )
            .expect("Failed to register source_errors"),

            publish_errors: register_int_counter!(
                "cadvisor_forecaster_publish_errors_total",
                "Forecasts the sink failed to accept"
            )
            .expect("Failed to register publish_errors"),

            series_processed: register_int_counter!(
                "cadvisor_forecaster_series_processed_total",
                "Labeled series run through the engine"
            )
            .expect("Failed to register series_processed"),

            last_pass_timestamp: register_int_gauge!(
                "cadvisor_forecaster_last_pass_timestamp_seconds",
                "Unix time of the last completed pass"
            )
            .expect("Failed to register last_pass_timestamp"),
        }
    }
}

/// Forecaster self-metrics
///
/// A lightweight handle to the global metrics instance. Clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ForecasterMetrics {
    _private: (),
}

impl Default for ForecasterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecasterMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecasterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecasterMetricsInner {
        GLOBAL_METRICS.get_or_init(ForecasterMetricsInner::new)
    }

    pub fn observe_pass_latency(&self, duration_secs: f64) {
        self.inner().pass_latency_seconds.observe(duration_secs);
    }

    pub fn observe_fit_latency(&self, duration_secs: f64) {
        self.inner().fit_latency_seconds.observe(duration_secs);
    }

    pub fn inc_published(&self) {
        self.inner().forecasts_published.inc();
    }

    pub fn inc_fallback(&self, reason: &FallbackReason) {
        self.inner()
            .fallbacks
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn inc_source_errors(&self) {
        self.inner().source_errors.inc();
    }

    pub fn inc_publish_errors(&self) {
        self.inner().publish_errors.inc();
    }

    pub fn inc_series_processed(&self) {
        self.inner().series_processed.inc();
    }

    pub fn set_last_pass(&self, timestamp: i64) {
        self.inner().last_pass_timestamp.set(timestamp);
    }

    /// Number of fallbacks recorded for a reason
    pub fn fallback_count(&self, reason: &str) -> u64 {
        self.inner().fallbacks.with_label_values(&[reason]).get()
    }
}

/// Structured logger for forecaster events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log a forecast the sink accepted
    pub fn log_published(&self, metric: &str, labels: &LabelSet, value: f64, model: &str) {
        info!(
            event = "forecast_published",
            instance = %self.instance,
            metric = %metric,
            labels = %labels,
            value = value,
            model = %model,
            "Published forecast"
        );
    }

    /// Log a forecast that used the neutral default
    pub fn log_fallback(&self, metric: &str, labels: &LabelSet, reason: &FallbackReason) {
        info!(
            event = "forecast_fallback",
            instance = %self.instance,
            metric = %metric,
            labels = %labels,
            reason = reason.as_str(),
            details = %reason,
            "Using neutral forecast"
        );
    }

    pub fn log_publish_failed(&self, metric: &str, labels: &LabelSet, error: &str) {
        warn!(
            event = "publish_failed",
            instance = %self.instance,
            metric = %metric,
            labels = %labels,
            error = %error,
            "Failed to publish forecast"
        );
    }

    pub fn log_source_failed(&self, metric: &str, error: &str) {
        warn!(
            event = "source_query_failed",
            instance = %self.instance,
            metric = %metric,
            error = %error,
            "Range query failed, treating as no data"
        );
    }

    pub fn log_pass_complete(
        &self,
        metrics: usize,
        series: usize,
        modeled: usize,
        fallbacks: usize,
        failures: usize,
        duration_secs: f64,
    ) {
        info!(
            event = "pass_complete",
            instance = %self.instance,
            metrics = metrics,
            series = series,
            modeled = modeled,
            fallbacks = fallbacks,
            failures = failures,
            duration_secs = duration_secs,
            "Forecast pass complete"
        );
    }

    pub fn log_startup(&self, version: &str, model: &str, metrics: usize) {
        info!(
            event = "forecaster_started",
            instance = %self.instance,
            forecaster_version = %version,
            model = %model,
            metrics = metrics,
            "cAdvisor forecaster started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "forecaster_shutdown",
            instance = %self.instance,
            reason = %reason,
            "cAdvisor forecaster shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecaster_metrics_observe() {
        let metrics = ForecasterMetrics::new();

        metrics.observe_pass_latency(1.5);
        metrics.observe_fit_latency(0.002);
        metrics.inc_published();
        metrics.inc_source_errors();
        metrics.inc_publish_errors();
        metrics.inc_series_processed();
        metrics.set_last_pass(1_700_000_000);
    }

    #[test]
    fn test_fallback_counter_by_reason() {
        let metrics = ForecasterMetrics::new();
        let before = metrics.fallback_count("insufficient_rows");

        metrics.inc_fallback(&FallbackReason::InsufficientRows { got: 1, required: 2 });

        assert!(metrics.fallback_count("insufficient_rows") > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("forecaster-0");
        assert_eq!(logger.instance(), "forecaster-0");
    }
}
