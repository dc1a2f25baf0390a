//! Series files for offline forecasting
//!
//! Accepts a saved `query_range` reply, a bare array of
//! `{"metric": {...}, "values": [...]}` objects, or a bare array of
//! `[timestamp, value]` pairs.

use anyhow::{Context, Result};
use forecaster_lib::{LabelSet, LabeledSeries, RawPoint};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct ResponseData {
    result: Vec<LabeledSeries>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesDocument {
    QueryRange { data: ResponseData },
    Series(Vec<LabeledSeries>),
    Points(Vec<RawPoint>),
}

/// Parse a series document; bare point arrays are labeled with `metric`
pub fn parse_series(text: &str, metric: &str) -> Result<Vec<LabeledSeries>> {
    let document: SeriesDocument = serde_json::from_str(text).context(
        "Expected a query_range response, an array of series, or an array of [timestamp, value] pairs",
    )?;

    Ok(match document {
        SeriesDocument::QueryRange { data } => data.result,
        SeriesDocument::Series(series) => series,
        SeriesDocument::Points(points) => vec![LabeledSeries {
            labels: LabelSet::for_metric(metric),
            points,
        }],
    })
}

/// Read and parse a series file
pub fn read_series(path: &Path, metric: &str) -> Result<Vec<LabeledSeries>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_series(&text, metric).with_context(|| format!("Failed to parse {}", path.display()))
}
