//! Fallback policy
//!
//! Decides when a model output cannot be trusted and substitutes the
//! neutral forecast instead.

use crate::error::FitError;
use crate::models::Series;
use std::fmt;

/// Neutral forecast published when no reliable value can be produced.
///
/// Downstream alert thresholds are calibrated against this exact value.
pub const NEUTRAL_FORECAST: f64 = 0.5;

/// Default minimum number of rows before a fit is attempted
pub const DEFAULT_MIN_ROWS: usize = 2;

/// Returns true when the series is too short to fit
pub fn should_fallback(series: &Series, min_rows: usize) -> bool {
    series.is_empty() || series.len() < min_rows
}

/// Why the neutral forecast was used
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// The source returned no series for the metric
    NoSeries,
    /// Fewer rows than the configured minimum
    InsufficientRows { got: usize, required: usize },
    /// Fitting or prediction failed
    Fit(FitError),
}

impl FallbackReason {
    pub const NO_SERIES: &'static str = "no_series";
    pub const INSUFFICIENT_ROWS: &'static str = "insufficient_rows";
    pub const FIT_ERROR: &'static str = "fit_error";

    /// Short label used for metrics and structured logs
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoSeries => Self::NO_SERIES,
            FallbackReason::InsufficientRows { .. } => Self::INSUFFICIENT_ROWS,
            FallbackReason::Fit(_) => Self::FIT_ERROR,
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoSeries => write!(f, "no series returned"),
            FallbackReason::InsufficientRows { got, required } => {
                write!(f, "{} rows, need at least {}", got, required)
            }
            FallbackReason::Fit(e) => write!(f, "{}", e),
        }
    }
}

/// Result of one forecasting attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Modeled(f64),
    Fallback(FallbackReason),
}

impl ForecastOutcome {
    /// The value to publish
    pub fn value(&self) -> f64 {
        match self {
            ForecastOutcome::Modeled(v) => *v,
            ForecastOutcome::Fallback(_) => NEUTRAL_FORECAST,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ForecastOutcome::Fallback(_))
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            ForecastOutcome::Fallback(reason) => Some(reason),
            ForecastOutcome::Modeled(_) => None,
        }
    }

    /// Map a fit result through the post-check
    pub fn from_fit(result: Result<f64, FitError>) -> Self {
        match result {
            Ok(v) if v.is_finite() => ForecastOutcome::Modeled(v),
            Ok(_) => ForecastOutcome::Fallback(FallbackReason::Fit(FitError::NonFinite)),
            Err(e) => ForecastOutcome::Fallback(FallbackReason::Fit(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::DateTime;

    fn series_of(len: usize) -> Series {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Series::new(
            (0..len)
                .map(|i| Sample {
                    timestamp: start + chrono::Duration::minutes(i as i64),
                    value: i as f64,
                })
                .collect(),
        )
    }

    #[test]
    fn test_should_fallback_thresholds() {
        assert!(should_fallback(&series_of(0), DEFAULT_MIN_ROWS));
        assert!(should_fallback(&series_of(1), DEFAULT_MIN_ROWS));
        assert!(!should_fallback(&series_of(2), DEFAULT_MIN_ROWS));
        assert!(should_fallback(&series_of(4), 5));
    }

    #[test]
    fn test_empty_series_falls_back_even_with_zero_min_rows() {
        assert!(should_fallback(&series_of(0), 0));
    }

    #[test]
    fn test_outcome_values() {
        assert_eq!(ForecastOutcome::Modeled(42.0).value(), 42.0);
        assert_eq!(
            ForecastOutcome::Fallback(FallbackReason::NoSeries).value(),
            NEUTRAL_FORECAST
        );
        assert_eq!(NEUTRAL_FORECAST, 0.5);
    }

    #[test]
    fn test_from_fit_rejects_non_finite() {
        let outcome = ForecastOutcome::from_fit(Ok(f64::NAN));
        assert_eq!(
            outcome,
            ForecastOutcome::Fallback(FallbackReason::Fit(FitError::NonFinite))
        );
        assert_eq!(outcome.value(), NEUTRAL_FORECAST);

        let outcome = ForecastOutcome::from_fit(Err(FitError::Singular { parameters: 3 }));
        assert_eq!(outcome.fallback_reason().unwrap().as_str(), "fit_error");
    }

    #[test]
    fn test_reason_display() {
        let reason = FallbackReason::InsufficientRows {
            got: 1,
            required: 2,
        };
        assert_eq!(reason.to_string(), "1 rows, need at least 2");
        assert_eq!(reason.as_str(), "insufficient_rows");
    }
}
