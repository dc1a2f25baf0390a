//! Metrics source
//!
//! Range queries against a time-series store. The pipeline only sees the
//! [`MetricsSource`] trait; [`PrometheusSource`] is the HTTP implementation.

mod prometheus;

pub(crate) use self::prometheus::base_url;
pub use self::prometheus::{PrometheusSource, SourceConfig, DEFAULT_QUERY_TIMEOUT};

use crate::error::SourceQueryError;
use crate::models::LabeledSeries;
use async_trait::async_trait;
use std::time::Duration;

/// Default lookback window (24 hours)
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(86_400);

/// Default query resolution
pub const DEFAULT_STEP: &str = "60s";

/// A range query over `[start, end]` in epoch seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub query: String,
    pub start: i64,
    pub end: i64,
    pub step: String,
}

impl RangeQuery {
    /// Query the `lookback` window ending at `end`
    pub fn lookback(query: impl Into<String>, end: i64, lookback: Duration, step: impl Into<String>) -> Self {
        let lookback_secs = i64::try_from(lookback.as_secs()).unwrap_or(i64::MAX);
        Self {
            query: query.into(),
            start: end.saturating_sub(lookback_secs),
            end,
            step: step.into(),
        }
    }
}

/// Trait for time-series sources
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Run a range query, returning zero or more labeled series
    async fn query_range(&self, query: &RangeQuery) -> Result<Vec<LabeledSeries>, SourceQueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback_window() {
        let query = RangeQuery::lookback("container_processes", 1_700_086_400, DEFAULT_LOOKBACK, DEFAULT_STEP);

        assert_eq!(query.start, 1_700_000_000);
        assert_eq!(query.end, 1_700_086_400);
        assert_eq!(query.step, "60s");
    }

    #[test]
    fn test_lookback_saturates() {
        let query = RangeQuery::lookback("q", 10, Duration::from_secs(u64::MAX), "1m");
        assert_eq!(query.start, 10 - i64::MAX);
    }
}
