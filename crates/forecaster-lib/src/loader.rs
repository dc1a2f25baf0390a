//! Series loading
//!
//! Normalizes raw `[timestamp, value]` pairs into a [`Series`]. Loading
//! never fails and never drops a row: unusable values become `0.0`.

use crate::models::{RawPoint, RawValue, Sample, Series};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Value substituted for anything that is not a finite number
pub const COERCED_VALUE: f64 = 0.0;

/// Counters describing a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    /// Values replaced with [`COERCED_VALUE`]
    pub coerced: usize,
    /// Timestamps that could not be represented and were pinned to the epoch
    pub invalid_timestamps: usize,
}

/// Load raw points into a series
pub fn load(raw_points: &[RawPoint]) -> Series {
    load_with_stats(raw_points).0
}

/// Load raw points and report how many entries had to be coerced
pub fn load_with_stats(raw_points: &[RawPoint]) -> (Series, LoadStats) {
    let mut stats = LoadStats {
        rows: raw_points.len(),
        ..LoadStats::default()
    };

    let samples = raw_points
        .iter()
        .map(|point| {
            let timestamp = to_timestamp(point.timestamp).unwrap_or_else(|| {
                stats.invalid_timestamps += 1;
                DateTime::<Utc>::UNIX_EPOCH
            });
            let value = parse_value(&point.value).unwrap_or_else(|| {
                stats.coerced += 1;
                COERCED_VALUE
            });
            Sample { timestamp, value }
        })
        .collect();

    if stats.invalid_timestamps > 0 {
        warn!(
            rows = stats.rows,
            invalid = stats.invalid_timestamps,
            "Unrepresentable timestamps pinned to the Unix epoch"
        );
    }
    if stats.coerced > 0 {
        debug!(
            rows = stats.rows,
            coerced = stats.coerced,
            "Non-numeric sample values coerced to zero"
        );
    }

    (Series::new(samples), stats)
}

/// Parse a raw value, returning `None` when it is not a finite number
fn parse_value(value: &RawValue) -> Option<f64> {
    let parsed = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        RawValue::Other(_) => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Convert fractional epoch seconds to an absolute instant
fn to_timestamp(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}
