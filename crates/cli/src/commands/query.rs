//! Live forecast against Prometheus

use anyhow::{Context, Result};
use async_trait::async_trait;
use forecaster_lib::error::PublishError;
use forecaster_lib::pipeline::{OrchestratorBuilder, PassReport, PipelineConfig};
use forecaster_lib::predictor::ForecastEngine;
use forecaster_lib::sink::{ForecastSink, MemorySink, PushgatewaySink, SinkConfig};
use forecaster_lib::source::{MetricsSource, PrometheusSource, SourceConfig};
use forecaster_lib::ForecastResult;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;

use super::{describe_outcome, display_outcome, display_value};
use crate::output::{print_error, print_info, print_success, print_table, print_warning, OutputFormat};

/// Options for a live query
pub struct QueryOptions {
    pub metric: String,
    pub prometheus_url: String,
    pub lookback: Duration,
    pub step: String,
    pub timeout: Duration,
    /// Push to this Pushgateway instead of only printing
    pub push: Option<SinkConfig>,
}

/// Records every forecast and optionally forwards it to a real sink
struct RecordingSink {
    recorded: MemorySink,
    forward: Option<PushgatewaySink>,
}

#[async_trait]
impl ForecastSink for RecordingSink {
    async fn publish(&self, result: &ForecastResult) -> Result<(), PublishError> {
        self.recorded.publish(result).await?;
        match &self.forward {
            Some(sink) => sink.publish(result).await,
            None => Ok(()),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct QueryRow {
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Value", display_with = "display_value")]
    value: f64,
    #[tabled(rename = "Outcome", display_with = "display_outcome")]
    outcome: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&ForecastResult> for QueryRow {
    fn from(result: &ForecastResult) -> Self {
        let (outcome, details) = describe_outcome(result);
        Self {
            labels: result.labels.to_string(),
            value: result.value,
            outcome,
            details,
        }
    }
}

/// Run one pass for a single metric and print every forecast
pub async fn query_metric(options: QueryOptions, engine: ForecastEngine, format: OutputFormat) -> Result<()> {
    let source = PrometheusSource::new(&SourceConfig {
        url: options.prometheus_url.clone(),
        timeout: options.timeout,
    })
    .context("Failed to create Prometheus source")?;

    let forward = options
        .push
        .as_ref()
        .map(PushgatewaySink::new)
        .transpose()
        .context("Failed to create Pushgateway sink")?;
    let pushing = forward.is_some();

    let (results, report) = run_single_metric(Arc::new(source), forward, engine, &options).await?;

    let rows: Vec<QueryRow> = results.iter().map(QueryRow::from).collect();
    print_table(&rows, format)?;

    if let OutputFormat::Table = format {
        print_summary(&options.metric, &report, pushing);
    }
    Ok(())
}

async fn run_single_metric(
    source: Arc<dyn MetricsSource>,
    forward: Option<PushgatewaySink>,
    engine: ForecastEngine,
    options: &QueryOptions,
) -> Result<(Vec<ForecastResult>, PassReport)> {
    let sink = Arc::new(RecordingSink {
        recorded: MemorySink::new(),
        forward,
    });

    let orchestrator = OrchestratorBuilder::new()
        .source(source)
        .sink(sink.clone())
        .engine(engine)
        .config(PipelineConfig {
            metrics: vec![options.metric.clone()],
            lookback: options.lookback,
            step: options.step.clone(),
            max_concurrency: 1,
        })
        .build()?;

    let report = orchestrator.run_pass().await;
    Ok((sink.recorded.published(), report))
}

fn print_summary(metric: &str, report: &PassReport, pushing: bool) {
    if report.source_failures > 0 {
        print_warning(&format!(
            "Range query for {} failed; the neutral forecast was used",
            metric
        ));
    }
    print_info(&format!(
        "{} series, {} modeled, {} neutral",
        report.series,
        report.modeled,
        report.fallback_total()
    ));
    if pushing {
        if report.publish_failures > 0 {
            print_error(&format!("{} pushes failed", report.publish_failures));
        } else {
            print_success(&format!("Pushed {} forecasts", report.published));
        }
    } else {
        print_info("Dry run: nothing was pushed (use --push to publish)");
    }
}
