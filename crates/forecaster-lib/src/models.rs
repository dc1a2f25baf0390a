//! Core data models for the forecaster

use crate::predictor::ForecastOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sample value as returned by the metrics source
///
/// Prometheus encodes sample values as strings, but numbers are accepted
/// too. Anything else is kept so the loader can coerce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// A single `[timestamp, value]` pair from a range query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, RawValue)", into = "(f64, RawValue)")]
pub struct RawPoint {
    /// Seconds since the Unix epoch, possibly fractional
    pub timestamp: f64,
    pub value: RawValue,
}

impl RawPoint {
    pub fn new(timestamp: f64, value: impl Into<RawValue>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

impl From<(f64, RawValue)> for RawPoint {
    fn from((timestamp, value): (f64, RawValue)) -> Self {
        Self { timestamp, value }
    }
}

impl From<RawPoint> for (f64, RawValue) {
    fn from(point: RawPoint) -> Self {
        (point.timestamp, point.value)
    }
}

/// A validated observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Time-ordered numeric series produced by the loader
///
/// Every value is finite. Order is the order the source returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Seconds between the earliest and latest timestamp
    pub fn time_span_secs(&self) -> f64 {
        let mut min = None::<DateTime<Utc>>;
        let mut max = None::<DateTime<Utc>>;
        for sample in &self.samples {
            min = Some(min.map_or(sample.timestamp, |m| m.min(sample.timestamp)));
            max = Some(max.map_or(sample.timestamp, |m| m.max(sample.timestamp)));
        }
        match (min, max) {
            (Some(min), Some(max)) => seconds_since_epoch(max) - seconds_since_epoch(min),
            _ => 0.0,
        }
    }
}

/// Fractional seconds since the Unix epoch
pub fn seconds_since_epoch(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp() as f64 + timestamp.timestamp_subsec_nanos() as f64 / 1e9
}

/// Label set attached to a series or forecast
///
/// Keys are unique and iterate in sorted order, so the key list can be
/// used directly as the gauge's label schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Labels used when the source returned nothing for a metric
    pub fn for_metric(metric: &str) -> Self {
        let mut labels = Self::new();
        labels.insert("metric", metric);
        labels
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}=\"{}\"", k, v)?;
        }
        write!(f, "}}")
    }
}

/// One label-distinguished series returned for a metric name
///
/// Field names follow the Prometheus `matrix` result shape so the
/// source can decode straight into this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledSeries {
    #[serde(rename = "metric", default)]
    pub labels: LabelSet,
    #[serde(rename = "values", default)]
    pub points: Vec<RawPoint>,
}

/// A forecast ready to be published
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub value: f64,
    pub labels: LabelSet,
    pub outcome: ForecastOutcome,
}

impl ForecastResult {
    pub fn new(outcome: ForecastOutcome, labels: LabelSet) -> Self {
        Self {
            value: outcome.value(),
            labels,
            outcome,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.outcome.is_fallback()
    }
}
