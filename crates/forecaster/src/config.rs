//! Forecaster configuration
//!
//! Every setting comes from an unprefixed environment variable, so
//! `PROMETHEUS_URL`, `FORECAST_HORIZON` and friends are read as-is.

use forecaster_lib::error::ConfigError;
use forecaster_lib::pipeline::{PipelineConfig, DEFAULT_METRICS};
use forecaster_lib::predictor::{
    EngineConfig, ModelKind, SeasonalityConfig, TrendConfig, DEFAULT_HORIZON_MINUTES,
    DEFAULT_MIN_ROWS,
};
use forecaster_lib::sink::{PushMode, SinkConfig, DEFAULT_JOB};
use forecaster_lib::source::{SourceConfig, DEFAULT_STEP};
use serde::Deserialize;
use std::time::Duration;

/// Forecaster configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ForecasterConfig {
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    #[serde(default = "default_pushgateway_url")]
    pub pushgateway_url: String,

    /// Lookback window in seconds
    #[serde(default = "default_lookback")]
    pub forecast_lookback: u64,

    #[serde(default = "default_step")]
    pub forecast_step: String,

    /// Horizon in minutes
    #[serde(default = "default_horizon")]
    pub forecast_horizon: u32,

    #[serde(default = "default_min_rows")]
    pub min_forecast_rows: usize,

    /// Metric names, defaults to the cAdvisor catalog
    #[serde(default = "default_metrics")]
    pub forecast_metrics: Vec<String>,

    #[serde(default = "default_model")]
    pub forecast_model: String,

    #[serde(default)]
    pub forecast_daily_seasonality: bool,

    #[serde(default)]
    pub forecast_weekly_seasonality: bool,

    #[serde(default)]
    pub forecast_yearly_seasonality: bool,

    #[serde(default = "default_timeout_secs")]
    pub forecast_query_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub forecast_push_timeout_secs: u64,

    #[serde(default = "default_push_job")]
    pub forecast_push_job: String,

    #[serde(default = "default_push_mode")]
    pub forecast_push_mode: String,

    /// Seconds between passes, 0 runs a single pass
    #[serde(default = "default_interval")]
    pub forecast_interval_secs: u64,

    #[serde(default = "default_max_concurrency")]
    pub forecast_max_concurrency: usize,

    /// Port for health and metrics
    #[serde(default = "default_api_port")]
    pub forecast_api_port: u16,

    /// Instance name used in structured logs
    #[serde(default = "default_instance", rename = "hostname")]
    pub instance: String,
}

fn default_prometheus_url() -> String {
    SourceConfig::default().url
}

fn default_pushgateway_url() -> String {
    SinkConfig::default().url
}

fn default_lookback() -> u64 {
    86_400
}

fn default_step() -> String {
    DEFAULT_STEP.to_string()
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_MINUTES
}

fn default_min_rows() -> usize {
    DEFAULT_MIN_ROWS
}

fn default_metrics() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
}

fn default_model() -> String {
    ModelKind::default().to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_push_job() -> String {
    DEFAULT_JOB.to_string()
}

fn default_push_mode() -> String {
    PushMode::default().to_string()
}

fn default_interval() -> u64 {
    300
}

fn default_max_concurrency() -> usize {
    1
}

fn default_api_port() -> u16 {
    8080
}

fn default_instance() -> String {
    "cadvisor-forecaster".to_string()
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            prometheus_url: default_prometheus_url(),
            pushgateway_url: default_pushgateway_url(),
            forecast_lookback: default_lookback(),
            forecast_step: default_step(),
            forecast_horizon: default_horizon(),
            min_forecast_rows: default_min_rows(),
            forecast_metrics: default_metrics(),
            forecast_model: default_model(),
            forecast_daily_seasonality: false,
            forecast_weekly_seasonality: false,
            forecast_yearly_seasonality: false,
            forecast_query_timeout_secs: default_timeout_secs(),
            forecast_push_timeout_secs: default_timeout_secs(),
            forecast_push_job: default_push_job(),
            forecast_push_mode: default_push_mode(),
            forecast_interval_secs: default_interval(),
            forecast_max_concurrency: default_max_concurrency(),
            forecast_api_port: default_api_port(),
            instance: default_instance(),
        }
    }
}

impl ForecasterConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(environment())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(environment().source(Some(map)))
    }

    fn from_environment(env: config::Environment) -> Result<Self, ConfigError> {
        let loaded: Self = config::Config::builder()
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        loaded.validate()
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        self.forecast_metrics = self
            .forecast_metrics
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if self.forecast_metrics.is_empty() {
            return Err(ConfigError::Invalid {
                name: "FORECAST_METRICS",
                reason: "at least one metric is required".to_string(),
            });
        }
        if self.forecast_lookback == 0 {
            return Err(ConfigError::Invalid {
                name: "FORECAST_LOOKBACK",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.forecast_step.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "FORECAST_STEP",
                reason: "must not be empty".to_string(),
            });
        }
        if self.forecast_max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "FORECAST_MAX_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }
        self.model()?;
        self.push_mode()?;
        Ok(self)
    }

    pub fn model(&self) -> Result<ModelKind, ConfigError> {
        self.forecast_model
            .parse()
            .map_err(|reason| ConfigError::Invalid {
                name: "FORECAST_MODEL",
                reason,
            })
    }

    pub fn push_mode(&self) -> Result<PushMode, ConfigError> {
        self.forecast_push_mode
            .parse()
            .map_err(|reason| ConfigError::Invalid {
                name: "FORECAST_PUSH_MODE",
                reason,
            })
    }

    /// `None` means run one pass and exit
    pub fn interval(&self) -> Option<Duration> {
        match self.forecast_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            url: self.prometheus_url.clone(),
            timeout: Duration::from_secs(self.forecast_query_timeout_secs),
        }
    }

    pub fn sink_config(&self) -> Result<SinkConfig, ConfigError> {
        Ok(SinkConfig {
            url: self.pushgateway_url.clone(),
            job: self.forecast_push_job.clone(),
            mode: self.push_mode()?,
            timeout: Duration::from_secs(self.forecast_push_timeout_secs),
        })
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        Ok(EngineConfig {
            horizon_minutes: self.forecast_horizon,
            min_rows: self.min_forecast_rows,
            model: self.model()?,
            trend: TrendConfig::default(),
            seasonality: SeasonalityConfig {
                daily: self.forecast_daily_seasonality,
                weekly: self.forecast_weekly_seasonality,
                yearly: self.forecast_yearly_seasonality,
            },
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            metrics: self.forecast_metrics.clone(),
            lookback: Duration::from_secs(self.forecast_lookback),
            step: self.forecast_step.clone(),
            max_concurrency: self.forecast_max_concurrency,
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("forecast_metrics")
}
