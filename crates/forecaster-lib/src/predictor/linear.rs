//! Ordinary least-squares trend
//!
//! A single straight line through the whole history. Cheaper than the
//! piecewise model and useful as a baseline.

use super::axis::{forecast_instant, sample_seconds};
use super::Forecaster;
use crate::error::FitError;
use crate::models::{seconds_since_epoch, Series};

/// Straight-line forecasting engine
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendForecaster;

impl Forecaster for LinearTrendForecaster {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn fit_and_predict(&self, series: &Series, horizon_minutes: u32) -> Result<f64, FitError> {
        if series.len() < 2 {
            return Err(FitError::InsufficientData {
                required: 2,
                got: series.len(),
            });
        }

        // Offsets from the first sample keep the sums well conditioned
        let secs = sample_seconds(series);
        let origin = secs[0];
        let xs: Vec<f64> = secs.iter().map(|s| s - origin).collect();
        let ys: Vec<f64> = series.values().collect();

        let (slope, intercept) = linear_regression(&xs, &ys)
            .ok_or(FitError::DegenerateAxis { rows: series.len() })?;

        let target = forecast_instant(series, horizon_minutes)
            .ok_or_else(|| FitError::Model("forecast instant out of range".to_string()))?;
        let value = intercept + slope * (seconds_since_epoch(target) - origin);

        if value.is_finite() {
            Ok(value)
        } else {
            Err(FitError::NonFinite)
        }
    }
}

/// Least-squares `(slope, intercept)` of `ys` against `xs`.
///
/// Returns `None` when all `xs` coincide.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / n_f;
    let mean_y = ys[..n].iter().sum::<f64>() / n_f;

    let (sxx, sxy) = xs[..n]
        .iter()
        .zip(&ys[..n])
        .fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });

    if sxx.abs() < f64::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::{DateTime, Duration};

    fn series(values: &[f64]) -> Series {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Series::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Sample {
                    timestamp: start + Duration::minutes(i as i64),
                    value: *v,
                })
                .collect(),
        )
    }

    #[test]
    fn test_linear_regression() {
        let (slope, intercept) =
            linear_regression(&[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((slope - 1.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_regression_degenerate() {
        assert!(linear_regression(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(linear_regression(&[], &[]).is_none());
    }

    #[test]
    fn test_forecast_extrapolates() {
        let value = LinearTrendForecaster
            .fit_and_predict(&series(&[10.0, 11.0, 12.0, 13.0]), 10)
            .unwrap();
        assert!((value - 23.0).abs() < 1e-9, "got {}", value);
    }

    #[test]
    fn test_constant_series() {
        let value = LinearTrendForecaster
            .fit_and_predict(&series(&[4.0; 5]), 60)
            .unwrap();
        assert!((value - 4.0).abs() < 1e-12);
    }
}
