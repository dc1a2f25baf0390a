//! Forecast publishing
//!
//! A forecast is a single gauge whose label names are the keys of the
//! forecast's label set. [`PushgatewaySink`] delivers it over HTTP;
//! [`MemorySink`] keeps it in process for dry runs and tests.

mod pushgateway;

pub use pushgateway::{encode_gauge, PushMode, PushgatewaySink, SinkConfig, DEFAULT_PUSH_TIMEOUT};

use crate::error::PublishError;
use crate::models::{ForecastResult, LabelSet};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::warn;

/// Name of the published gauge
pub const GAUGE_NAME: &str = "predicted_usage";

/// Help text of the published gauge
pub const GAUGE_HELP: &str = "Forecasted usage by ML model";

/// Default Pushgateway job
pub const DEFAULT_JOB: &str = "cadvisor_forecast";

/// Trait for forecast sinks
#[async_trait]
pub trait ForecastSink: Send + Sync {
    /// Deliver one forecast
    async fn publish(&self, result: &ForecastResult) -> Result<(), PublishError>;
}

/// Make a label set acceptable as a gauge label schema.
///
/// `__name__` becomes `metric` (unless `metric` is already present), other
/// reserved `__` labels are dropped, and invalid names are dropped.
pub fn sanitize_labels(labels: &LabelSet) -> LabelSet {
    let mut out = LabelSet::new();
    for (key, value) in labels.iter() {
        if key == "__name__" {
            if !labels.contains_key("metric") {
                out.insert("metric", value);
            }
        } else if key.starts_with("__") {
            continue;
        } else if is_valid_label_name(key) {
            out.insert(key, value);
        } else {
            warn!(label = %key, "Dropping invalid label name");
        }
    }
    out
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sink that records forecasts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<ForecastResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in publish order
    pub fn published(&self) -> Vec<ForecastResult> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ForecastSink for MemorySink {
    async fn publish(&self, result: &ForecastResult) -> Result<(), PublishError> {
        let mut published = self
            .published
            .lock()
            .map_err(|e| PublishError::Encode(format!("lock poisoned: {}", e)))?;
        published.push(result.clone());
        Ok(())
    }
}
