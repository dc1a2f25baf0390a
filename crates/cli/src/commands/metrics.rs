//! Metric catalog commands

use anyhow::Result;
use forecaster_lib::pipeline::DEFAULT_METRICS;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct MetricRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
}

/// Counters end in `_total`; everything else in the catalog is a gauge
fn metric_kind(name: &str) -> &'static str {
    if name.ends_with("_total") {
        "counter"
    } else {
        "gauge"
    }
}

/// List the metrics forecast by default
pub fn list_metrics(format: OutputFormat) -> Result<()> {
    let rows: Vec<MetricRow> = DEFAULT_METRICS
        .iter()
        .enumerate()
        .map(|(i, name)| MetricRow {
            index: i + 1,
            name: name.to_string(),
            kind: metric_kind(name),
        })
        .collect();

    print_table(&rows, format)
}
