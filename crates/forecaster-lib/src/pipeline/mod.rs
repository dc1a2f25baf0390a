//! Forecast pipeline
//!
//! One pass queries every configured metric, forecasts each labeled
//! series it gets back and publishes the result. Nothing that goes wrong
//! for one metric or one series stops the rest of the pass.

use crate::error::FitError;
use crate::health::{components, HealthRegistry};
use crate::loader::load_with_stats;
use crate::models::{ForecastResult, LabelSet, LabeledSeries};
use crate::observability::{ForecasterMetrics, StructuredLogger};
use crate::predictor::{FallbackReason, ForecastEngine, ForecastOutcome};
use crate::sink::ForecastSink;
use crate::source::{MetricsSource, RangeQuery, DEFAULT_LOOKBACK, DEFAULT_STEP};
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};


/// The cAdvisor metric catalog forecast by default
pub const DEFAULT_METRICS: &[&str] = &[
    "container_cpu_usage_seconds_total",
    "container_cpu_cfs_periods_total",
    "container_cpu_cfs_throttled_periods_total",
    "container_memory_usage_bytes",
    "container_memory_working_set_bytes",
    "container_memory_cache",
    "container_fs_reads_bytes_total",
    "container_fs_writes_bytes_total",
    "container_fs_usage_bytes",
    "container_network_receive_bytes_total",
    "container_network_transmit_bytes_total",
    "container_network_receive_packets_total",
    "container_network_transmit_packets_total",
    "container_processes",
    "container_start_time_seconds",
];

/// Configuration for a forecast pass
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Metric names, each used verbatim as a range query
    pub metrics: Vec<String>,
    /// Window queried before now
    pub lookback: Duration,
    /// Query resolution, e.g. `60s`
    pub step: String,
    /// Metrics processed at once (1 = sequential)
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            lookback: DEFAULT_LOOKBACK,
            step: DEFAULT_STEP.to_string(),
            max_concurrency: 1,
        }
    }
}

/// Counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Metric names processed
    pub metrics: usize,
    /// Labeled series run through the engine
    pub series: usize,
    /// Forecasts that came from the model
    pub modeled: usize,
    /// Neutral forecasts, keyed by reason
    pub fallbacks: BTreeMap<&'static str, usize>,
    /// Forecasts the sink accepted
    pub published: usize,
    pub source_failures: usize,
    pub publish_failures: usize,
}

impl PassReport {
    pub fn fallback_total(&self) -> usize {
        self.fallbacks.values().sum()
    }

    pub fn fallback_count(&self, reason: &str) -> usize {
        self.fallbacks.get(reason).copied().unwrap_or(0)
    }

    /// True when neither the source nor the sink failed
    pub fn is_clean(&self) -> bool {
        self.source_failures == 0 && self.publish_failures == 0
    }

    pub fn merge(&mut self, other: PassReport) {
        self.metrics += other.metrics;
        self.series += other.series;
        self.modeled += other.modeled;
        self.published += other.published;
        self.source_failures += other.source_failures;
        self.publish_failures += other.publish_failures;
        for (reason, count) in other.fallbacks {
            *self.fallbacks.entry(reason).or_default() += count;
        }
    }

    fn record_outcome(&mut self, outcome: &ForecastOutcome) {
        match outcome.fallback_reason() {
            Some(reason) => *self.fallbacks.entry(reason.as_str()).or_default() += 1,
            None => self.modeled += 1,
        }
    }
}

/// Runs forecast passes from a source, through the engine, to a sink
#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn ForecastSink>,
    engine: ForecastEngine,
    config: PipelineConfig,
    metrics: ForecasterMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn ForecastSink>,
        engine: ForecastEngine,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            engine,
            config,
            metrics: ForecasterMetrics::new(),
            logger: StructuredLogger::new("cadvisor-forecaster"),
            health: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    /// Run one pass over every configured metric
    pub async fn run_pass(&self) -> PassReport {
        let start = Instant::now();
        let now = Utc::now().timestamp();

        let report = if self.config.max_concurrency <= 1 {
            let mut report = PassReport::default();
            for metric in &self.config.metrics {
                report.merge(self.process_metric(metric, now).await);
            }
            report
        } else {
            self.run_concurrent(now).await
        };

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.observe_pass_latency(elapsed);
        self.metrics.set_last_pass(Utc::now().timestamp());
        self.logger.log_pass_complete(
            report.metrics,
            report.series,
            report.modeled,
            report.fallback_total(),
            report.source_failures + report.publish_failures,
            elapsed,
        );

        if let Some(health) = &self.health {
            update_health(health, &report).await;
        }

        report
    }

    async fn run_concurrent(&self, now: i64) -> PassReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();

        for metric in self.config.metrics.iter().cloned() {
            let this = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                this.process_metric(&metric, now).await
            });
        }

        let mut report = PassReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(metric_report) => report.merge(metric_report),
                Err(e) => error!(error = %e, "Metric task failed"),
            }
        }
        report
    }

    /// Query, forecast and publish a single metric
    async fn process_metric(&self, metric: &str, now: i64) -> PassReport {
        let mut report = PassReport {
            metrics: 1,
            ..PassReport::default()
        };

        let query = RangeQuery::lookback(metric, now, self.config.lookback, self.config.step.as_str());
        let series = match self.source.query_range(&query).await {
            Ok(series) => series,
            Err(e) => {
                self.metrics.inc_source_errors();
                self.logger.log_source_failed(metric, &e.to_string());
                report.source_failures += 1;
                Vec::new()
            }
        };

        if series.is_empty() {
            let result = ForecastResult::new(
                ForecastOutcome::Fallback(FallbackReason::NoSeries),
                LabelSet::for_metric(metric),
            );
            self.publish(metric, &result, &mut report).await;
            return report;
        }

        debug!(metric = %metric, series = series.len(), "Forecasting series");
        for labeled in series {
            let result = self.forecast_off_runtime(labeled).await;
            report.series += 1;
            self.publish(metric, &result, &mut report).await;
        }

        report
    }

    /// Fit on the blocking pool so long series do not stall the runtime
    async fn forecast_off_runtime(&self, labeled: LabeledSeries) -> ForecastResult {
        let labels = labeled.labels.clone();
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.forecast_series(&labeled)).await {
            Ok(result) => result,
            Err(e) => {
                error!(labels = %labels, error = %e, "Forecast task failed");
                ForecastResult::new(
                    ForecastOutcome::Fallback(FallbackReason::Fit(FitError::Model(e.to_string()))),
                    labels,
                )
            }
        }
    }

    /// Load and forecast one labeled series without publishing it
    pub fn forecast_series(&self, labeled: &LabeledSeries) -> ForecastResult {
        let (series, stats) = load_with_stats(&labeled.points);
        if stats.coerced > 0 {
            debug!(
                labels = %labeled.labels,
                coerced = stats.coerced,
                "Series contained non-numeric values"
            );
        }

        let start = Instant::now();
        let outcome = self.engine.forecast(&series);
        self.metrics.observe_fit_latency(start.elapsed().as_secs_f64());
        self.metrics.inc_series_processed();

        ForecastResult::new(outcome, labeled.labels.clone())
    }

    async fn publish(&self, metric: &str, result: &ForecastResult, report: &mut PassReport) {
        report.record_outcome(&result.outcome);
        if let Some(reason) = result.outcome.fallback_reason() {
            self.metrics.inc_fallback(reason);
            self.logger.log_fallback(metric, &result.labels, reason);
        }

        match self.sink.publish(result).await {
            Ok(()) => {
                self.metrics.inc_published();
                report.published += 1;
                self.logger.log_published(
                    metric,
                    &result.labels,
                    result.value,
                    self.engine.model_name(),
                );
            }
            Err(e) => {
                self.metrics.inc_publish_errors();
                report.publish_failures += 1;
                self.logger.log_publish_failed(metric, &result.labels, &e.to_string());
            }
        }
    }

    /// Run passes every `every` until a shutdown signal arrives.
    ///
    /// A pass in progress always completes before the loop exits.
    pub async fn run(&self, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = every.as_secs(),
            metrics = self.config.metrics.len(),
            "Starting forecast loop"
        );

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pass().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down forecast loop");
                    break;
                }
            }
        }
    }
}

async fn update_health(health: &HealthRegistry, report: &PassReport) {
    health
        .record(components::SOURCE, report.source_failures, report.metrics, "range queries")
        .await;
    health
        .record(
            components::SINK,
            report.publish_failures,
            report.published + report.publish_failures,
            "pushes",
        )
        .await;
    // Only labeled series reach a model; short series never get fit
    let fits = report
        .series
        .saturating_sub(report.fallback_count(FallbackReason::INSUFFICIENT_ROWS));
    health
        .record(
            components::ENGINE,
            report.fallback_count(FallbackReason::FIT_ERROR),
            fits,
            "fits",
        )
        .await;
    health.mark_pass_complete(Utc::now().timestamp()).await;
}

/// Builder for the orchestrator
pub struct OrchestratorBuilder {
    source: Option<Arc<dyn MetricsSource>>,
    sink: Option<Arc<dyn ForecastSink>>,
    engine: ForecastEngine,
    config: PipelineConfig,
    logger: Option<StructuredLogger>,
    health: Option<HealthRegistry>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            sink: None,
            engine: ForecastEngine::default(),
            config: PipelineConfig::default(),
            logger: None,
            health: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ForecastSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn engine(mut self, engine: ForecastEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the metric list
    pub fn metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Report pass results to a health registry
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Metrics source is required"))?;
        let sink = self
            .sink
            .ok_or_else(|| anyhow::anyhow!("Forecast sink is required"))?;
        if self.config.metrics.is_empty() {
            anyhow::bail!("At least one metric is required");
        }

        let mut orchestrator = Orchestrator::new(source, sink, self.engine, self.config);
        if let Some(logger) = self.logger {
            orchestrator.logger = logger;
        }
        orchestrator.health = self.health;
        Ok(orchestrator)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
