//! cAdvisor Forecaster CLI
//!
//! A command-line tool for forecasting series offline, dry-running the
//! forecast pipeline against Prometheus, and checking the daemon.

mod client;
mod commands;
mod input;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, metrics, predict, query};
use forecaster_lib::predictor::{EngineConfig, ForecastEngine, ModelKind, SeasonalityConfig};
use forecaster_lib::sink::{PushMode, SinkConfig, DEFAULT_JOB};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// cAdvisor Forecaster CLI
#[derive(Parser)]
#[command(name = "fcast")]
#[command(author, version, about = "CLI for the cAdvisor Forecaster", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Forecast horizon in minutes
    #[arg(long, global = true, env = "FORECAST_HORIZON", default_value_t = 60)]
    pub horizon: u32,

    /// Minimum rows before a model is fit
    #[arg(long, global = true, env = "MIN_FORECAST_ROWS", default_value_t = 2)]
    pub min_rows: usize,

    /// Model to fit (piecewise or linear)
    #[arg(long, global = true, env = "FORECAST_MODEL", default_value = "piecewise")]
    pub model: ModelKind,

    /// Enable daily seasonality
    #[arg(long, global = true)]
    pub daily_seasonality: bool,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast series from a JSON file without publishing
    Predict {
        /// Series file (query_range response, series array or [timestamp, value] pairs)
        #[arg(long)]
        file: PathBuf,

        /// Metric label for bare [timestamp, value] input
        #[arg(long, default_value = "input")]
        metric: String,
    },

    /// Query Prometheus and forecast one metric (dry run unless --push)
    Query {
        /// Metric name to query
        #[arg(long)]
        metric: String,

        /// Prometheus URL
        #[arg(long, env = "PROMETHEUS_URL", default_value = "http://localhost:9090")]
        prometheus_url: String,

        /// Lookback window in seconds
        #[arg(long, env = "FORECAST_LOOKBACK", default_value_t = 86_400)]
        lookback: u64,

        /// Query step
        #[arg(long, env = "FORECAST_STEP", default_value = "60s")]
        step: String,

        /// Query timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Push the forecasts to the Pushgateway
        #[arg(long)]
        push: bool,

        /// Pushgateway URL
        #[arg(long, env = "PUSHGATEWAY_URL", default_value = "http://localhost:9091")]
        pushgateway_url: String,

        /// Pushgateway job
        #[arg(long, env = "FORECAST_PUSH_JOB", default_value = DEFAULT_JOB)]
        job: String,

        /// Push mode (replace or merge)
        #[arg(long, env = "FORECAST_PUSH_MODE", default_value = "replace")]
        mode: PushMode,
    },

    /// Inspect the default metric catalog
    #[command(subcommand)]
    Metrics(MetricsCommands),

    /// Show health and readiness of a running forecaster
    Health {
        /// Forecaster API URL
        #[arg(long, env = "FORECASTER_API_URL", default_value = "http://localhost:8080")]
        url: String,
    },
}

#[derive(Subcommand)]
pub enum MetricsCommands {
    /// List the metrics forecast by default
    List,
}

impl Cli {
    fn engine(&self) -> ForecastEngine {
        ForecastEngine::new(EngineConfig {
            horizon_minutes: self.horizon,
            min_rows: self.min_rows,
            model: self.model,
            seasonality: SeasonalityConfig {
                daily: self.daily_seasonality,
                ..SeasonalityConfig::default()
            },
            ..EngineConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let engine = cli.engine();

    match cli.command {
        Commands::Predict { file, metric } => {
            predict::predict_file(&file, &metric, &engine, cli.format)?;
        }
        Commands::Query {
            metric,
            prometheus_url,
            lookback,
            step,
            timeout,
            push,
            pushgateway_url,
            job,
            mode,
        } => {
            let push = push.then(|| SinkConfig {
                url: pushgateway_url,
                job,
                mode,
                timeout: Duration::from_secs(timeout),
            });
            let options = query::QueryOptions {
                metric,
                prometheus_url,
                lookback: Duration::from_secs(lookback),
                step,
                timeout: Duration::from_secs(timeout),
                push,
            };
            query::query_metric(options, engine, cli.format).await?;
        }
        Commands::Metrics(MetricsCommands::List) => {
            metrics::list_metrics(cli.format)?;
        }
        Commands::Health { url } => {
            let client = client::DaemonClient::new(&url)?;
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
