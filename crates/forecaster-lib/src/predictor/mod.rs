//! Forecasting engine
//!
//! The [`Forecaster`] trait is the pluggable model seam. [`ForecastEngine`]
//! wraps any forecaster with the fallback policy, so callers always get a
//! value: either a model output or [`NEUTRAL_FORECAST`].

mod axis;
mod fallback;
mod linalg;
mod linear;
mod piecewise;
mod seasonality;

pub use axis::{forecast_instant, last_observed, FUTURE_STEP_SECS};
pub use fallback::{
    should_fallback, FallbackReason, ForecastOutcome, DEFAULT_MIN_ROWS, NEUTRAL_FORECAST,
};
pub use linear::{linear_regression, LinearTrendForecaster};
pub use piecewise::{PiecewiseTrendForecaster, PiecewiseTrendModel, TrendConfig};
pub use seasonality::{FourierTerm, SeasonalityConfig};

use crate::error::FitError;
use crate::models::Series;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default forecast horizon in minutes
pub const DEFAULT_HORIZON_MINUTES: u32 = 60;

/// Trait for forecasting model implementations
pub trait Forecaster: Send + Sync {
    /// Short model name used in logs
    fn name(&self) -> &'static str;

    /// Fit a fresh model to the series and predict `horizon_minutes` past
    /// the last observation
    fn fit_and_predict(&self, series: &Series, horizon_minutes: u32) -> Result<f64, FitError>;
}

/// Built-in model selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Piecewise-linear trend with optional seasonality
    #[default]
    Piecewise,
    /// Single least-squares line
    Linear,
}

impl ModelKind {
    pub fn build(self, trend: TrendConfig, seasonality: SeasonalityConfig) -> Arc<dyn Forecaster> {
        match self {
            ModelKind::Piecewise => Arc::new(PiecewiseTrendForecaster::new(trend, seasonality)),
            ModelKind::Linear => Arc::new(LinearTrendForecaster),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Piecewise => write!(f, "piecewise"),
            ModelKind::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "piecewise" | "prophet" => Ok(ModelKind::Piecewise),
            "linear" => Ok(ModelKind::Linear),
            other => Err(format!("unknown model '{}', expected piecewise or linear", other)),
        }
    }
}

/// Configuration for the forecasting engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minutes past the last observation to forecast
    pub horizon_minutes: u32,
    /// Minimum rows before a fit is attempted
    pub min_rows: usize,
    pub model: ModelKind,
    pub trend: TrendConfig,
    pub seasonality: SeasonalityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: DEFAULT_HORIZON_MINUTES,
            min_rows: DEFAULT_MIN_ROWS,
            model: ModelKind::default(),
            trend: TrendConfig::default(),
            seasonality: SeasonalityConfig::default(),
        }
    }
}

/// A forecaster composed with the fallback policy
#[derive(Clone)]
pub struct ForecastEngine {
    forecaster: Arc<dyn Forecaster>,
    config: EngineConfig,
}

impl ForecastEngine {
    /// Build the engine selected by the configuration
    pub fn new(config: EngineConfig) -> Self {
        let forecaster = config.model.build(config.trend, config.seasonality);
        Self { forecaster, config }
    }

    /// Use a custom forecaster, keeping horizon and minimum rows from `config`
    pub fn with_forecaster(forecaster: Arc<dyn Forecaster>, config: EngineConfig) -> Self {
        Self { forecaster, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model_name(&self) -> &'static str {
        self.forecaster.name()
    }

    /// Forecast a series, falling back to the neutral value when the
    /// series is too short or the model fails
    pub fn forecast(&self, series: &Series) -> ForecastOutcome {
        if should_fallback(series, self.config.min_rows) {
            debug!(
                rows = series.len(),
                min_rows = self.config.min_rows,
                "Series below minimum rows, using neutral forecast"
            );
            return ForecastOutcome::Fallback(FallbackReason::InsufficientRows {
                got: series.len(),
                required: self.config.min_rows,
            });
        }

        let horizon = self.config.horizon_minutes;
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.forecaster.fit_and_predict(series, horizon)
        }))
        .unwrap_or_else(|_| Err(FitError::Model(format!("{} panicked", self.forecaster.name()))));

        let outcome = ForecastOutcome::from_fit(result);
        if let Some(reason) = outcome.fallback_reason() {
            warn!(
                model = self.forecaster.name(),
                rows = series.len(),
                error = %reason,
                "Forecast failed, using neutral forecast"
            );
        }
        outcome
    }

    /// Convenience wrapper returning only the value
    pub fn forecast_value(&self, series: &Series) -> f64 {
        self.forecast(series).value()
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for ForecastEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastEngine")
            .field("model", &self.forecaster.name())
            .field("config", &self.config)
            .finish()
    }
}
