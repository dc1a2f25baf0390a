//! Time axis helpers shared by the forecasting engines

use crate::models::{seconds_since_epoch, Series};
use chrono::{DateTime, Duration, Utc};

/// Spacing of the future axis in seconds.
///
/// Fixed at one minute regardless of the query step, so the forecast
/// always lands `horizon` minutes after the last observation.
pub const FUTURE_STEP_SECS: i64 = 60;

/// Epoch seconds of every sample, in series order
pub fn sample_seconds(series: &Series) -> Vec<f64> {
    series
        .samples()
        .iter()
        .map(|s| seconds_since_epoch(s.timestamp))
        .collect()
}

/// Latest observed timestamp
pub fn last_observed(series: &Series) -> Option<DateTime<Utc>> {
    series.samples().iter().map(|s| s.timestamp).max()
}

/// The instant the forecast is read at: `horizon` one-minute steps after
/// the last observation
pub fn forecast_instant(series: &Series, horizon_minutes: u32) -> Option<DateTime<Utc>> {
    let last = last_observed(series)?;
    last.checked_add_signed(Duration::seconds(
        FUTURE_STEP_SECS * i64::from(horizon_minutes),
    ))
}
