//! Piecewise-linear trend model with optional Fourier seasonality
//!
//! The model is additive: `y(t) = g(t) + s(t) + noise`. The trend `g` is
//! linear with rate adjustments at a set of potential changepoints. The
//! adjustments carry a Gaussian prior, so most of them shrink to zero and
//! the fit stays stable on short or noisy series.
//!
//! Time is scaled to `[0, 1]` over the observed span and values are scaled
//! by their largest magnitude before fitting, which keeps the prior scales
//! meaningful regardless of the metric's units.

use super::axis::{forecast_instant, sample_seconds};
use super::linalg::ridge_least_squares;
use super::seasonality::{FourierTerm, SeasonalityConfig};
use super::Forecaster;
use crate::error::FitError;
use crate::models::{seconds_since_epoch, Series};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Residual scale assumed when converting prior scales to ridge penalties
const NOISE_SCALE: f64 = 0.05;

/// Trend fitting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Maximum number of potential changepoints
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints are placed
    pub changepoint_range: f64,
    /// Prior scale of the changepoint rate adjustments
    pub changepoint_prior_scale: f64,
    /// Prior scale of the Fourier coefficients
    pub seasonality_prior_scale: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
        }
    }
}

/// Default forecasting engine
#[derive(Debug, Clone, Default)]
pub struct PiecewiseTrendForecaster {
    trend: TrendConfig,
    seasonality: SeasonalityConfig,
}

impl PiecewiseTrendForecaster {
    pub fn new(trend: TrendConfig, seasonality: SeasonalityConfig) -> Self {
        Self { trend, seasonality }
    }

    /// Fit the model to a series
    pub fn fit(&self, series: &Series) -> Result<PiecewiseTrendModel, FitError> {
        let n = series.len();
        if n < 2 {
            return Err(FitError::InsufficientData {
                required: 2,
                got: n,
            });
        }

        let secs = sample_seconds(series);
        let t_start = secs.iter().copied().fold(f64::INFINITY, f64::min);
        let t_end = secs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = t_end - t_start;
        if !(span > 0.0) {
            return Err(FitError::DegenerateAxis { rows: n });
        }

        let y_scale = series
            .values()
            .map(f64::abs)
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let mut model = PiecewiseTrendModel {
            t_start,
            span,
            y_scale,
            changepoints: Vec::new(),
            terms: self.seasonality.terms(),
            params: Vec::new(),
        };

        let scaled_t: Vec<f64> = secs.iter().map(|s| model.scale_time(*s)).collect();
        model.changepoints = self.place_changepoints(&scaled_t);

        let rows: Vec<Vec<f64>> = secs.iter().map(|s| model.features(*s)).collect();
        let targets: Vec<f64> = series.values().map(|v| v / y_scale).collect();
        let penalties = self.penalties(&model);

        model.params = ridge_least_squares(&rows, &targets, &penalties)?;

        debug!(
            rows = n,
            changepoints = model.changepoints.len(),
            seasonal_terms = model.terms.len(),
            "Fitted piecewise trend model"
        );

        Ok(model)
    }

    /// Potential changepoints, uniformly spaced over the first part of the
    /// history. Fewer are used when the history is short.
    fn place_changepoints(&self, scaled_t: &[f64]) -> Vec<f64> {
        let mut sorted = scaled_t.to_vec();
        sorted.sort_by(f64::total_cmp);

        let range = self.trend.changepoint_range.clamp(0.0, 1.0);
        let hist_size = (sorted.len() as f64 * range).floor() as usize;
        let count = self.trend.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last = (hist_size - 1) as f64;
        (1..=count)
            .map(|i| {
                let idx = (i as f64 * last / count as f64).round() as usize;
                sorted[idx.min(sorted.len() - 1)]
            })
            .collect()
    }

    fn penalties(&self, model: &PiecewiseTrendModel) -> Vec<f64> {
        let delta_penalty = (NOISE_SCALE / self.trend.changepoint_prior_scale).powi(2);
        let seasonal_penalty = (NOISE_SCALE / self.trend.seasonality_prior_scale).powi(2);
        let seasonal_width: usize = model.terms.iter().map(FourierTerm::width).sum();

        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(delta_penalty).take(model.changepoints.len()));
        penalties.extend(std::iter::repeat(seasonal_penalty).take(seasonal_width));
        penalties
    }
}

impl Forecaster for PiecewiseTrendForecaster {
    fn name(&self) -> &'static str {
        "piecewise"
    }

    fn fit_and_predict(&self, series: &Series, horizon_minutes: u32) -> Result<f64, FitError> {
        let model = self.fit(series)?;
        let target = forecast_instant(series, horizon_minutes)
            .ok_or_else(|| FitError::Model("forecast instant out of range".to_string()))?;
        let value = model.predict(target);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FitError::NonFinite)
        }
    }
}

/// A fitted model. Lives for a single forecast.
#[derive(Debug, Clone)]
pub struct PiecewiseTrendModel {
    t_start: f64,
    span: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    terms: Vec<FourierTerm>,
    /// `[k, m, deltas..., fourier...]`
    params: Vec<f64>,
}

impl PiecewiseTrendModel {
    fn scale_time(&self, epoch_secs: f64) -> f64 {
        (epoch_secs - self.t_start) / self.span
    }

    fn features(&self, epoch_secs: f64) -> Vec<f64> {
        let t = self.scale_time(epoch_secs);
        let mut row = Vec::with_capacity(2 + self.changepoints.len());
        row.push(t);
        row.push(1.0);
        row.extend(self.changepoints.iter().map(|s| (t - s).max(0.0)));
        for term in &self.terms {
            term.push_features(epoch_secs, &mut row);
        }
        row
    }

    /// Predicted value at an instant, in the series' original units
    pub fn predict(&self, timestamp: DateTime<Utc>) -> f64 {
        let row = self.features(seconds_since_epoch(timestamp));
        let scaled: f64 = row.iter().zip(&self.params).map(|(x, b)| x * b).sum();
        scaled * self.y_scale
    }

    /// Trend component only, in original units
    pub fn trend_at(&self, timestamp: DateTime<Utc>) -> f64 {
        let row = self.features(seconds_since_epoch(timestamp));
        let trend_width = 2 + self.changepoints.len();
        let scaled: f64 = row
            .iter()
            .zip(&self.params)
            .take(trend_width)
            .map(|(x, b)| x * b)
            .sum();
        scaled * self.y_scale
    }

    /// Changepoint locations on the scaled `[0, 1]` axis
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    /// Rate after the last changepoint, in original units per second
    pub fn final_rate(&self) -> f64 {
        let base = self.params.first().copied().unwrap_or(0.0);
        let deltas: f64 = self
            .params
            .iter()
            .skip(2)
            .take(self.changepoints.len())
            .sum();
        (base + deltas) * self.y_scale / self.span
    }
}
