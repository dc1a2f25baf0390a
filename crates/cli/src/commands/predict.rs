//! Offline forecasting from a series file

use anyhow::Result;
use forecaster_lib::loader::load_with_stats;
use forecaster_lib::predictor::{forecast_instant, ForecastEngine};
use forecaster_lib::{ForecastResult, LabeledSeries};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::{describe_outcome, display_outcome, display_value};
use crate::input::read_series;
use crate::output::{print_info, print_table, print_warning, OutputFormat};

/// Row for the predictions table
#[derive(Debug, Tabled, Serialize)]
pub(crate) struct PredictionRow {
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Coerced")]
    coerced: usize,
    #[tabled(rename = "Forecast For")]
    forecast_for: String,
    #[tabled(rename = "Value", display_with = "display_value")]
    value: f64,
    #[tabled(rename = "Outcome", display_with = "display_outcome")]
    outcome: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Forecast every series with the engine
pub(crate) fn predict_rows(series: &[LabeledSeries], engine: &ForecastEngine) -> Vec<PredictionRow> {
    let horizon = engine.config().horizon_minutes;

    series
        .iter()
        .map(|labeled| {
            let (loaded, stats) = load_with_stats(&labeled.points);
            let result = ForecastResult::new(engine.forecast(&loaded), labeled.labels.clone());
            let (outcome, details) = describe_outcome(&result);

            PredictionRow {
                labels: result.labels.to_string(),
                rows: stats.rows,
                coerced: stats.coerced,
                forecast_for: forecast_instant(&loaded, horizon)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string()),
                value: result.value,
                outcome,
                details,
            }
        })
        .collect()
}

/// Forecast the series in a file and print the results without publishing
pub fn predict_file(
    path: &Path,
    metric: &str,
    engine: &ForecastEngine,
    format: OutputFormat,
) -> Result<()> {
    let series = read_series(path, metric)?;
    if series.is_empty() {
        print_warning("File contains no series");
        return Ok(());
    }

    let rows = predict_rows(&series, engine);
    print_table(&rows, format)?;

    if let OutputFormat::Table = format {
        let modeled = rows.iter().filter(|r| r.outcome == "modeled").count();
        print_info(&format!(
            "{} series, {} modeled, {} neutral (model: {}, horizon: {}m)",
            rows.len(),
            modeled,
            rows.len() - modeled,
            engine.model_name(),
            engine.config().horizon_minutes
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecaster_lib::predictor::NEUTRAL_FORECAST;
    use forecaster_lib::{LabelSet, RawPoint};

    fn series(values: &[&str]) -> LabeledSeries {
        LabeledSeries {
            labels: LabelSet::for_metric("container_processes"),
            points: values
                .iter()
                .enumerate()
                .map(|(i, v)| RawPoint::new(1_700_000_000.0 + 60.0 * i as f64, *v))
                .collect(),
        }
    }

    #[test]
    fn test_predict_rows_constant_series() {
        let rows = predict_rows(&[series(&["4", "4", "4", "4"])], &ForecastEngine::default());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outcome, "modeled");
        assert!((rows[0].value - 4.0).abs() < 1e-6);
        assert_eq!(rows[0].rows, 4);
        assert!(rows[0].forecast_for.starts_with("2023-11-14T"));
    }

    #[test]
    fn test_predict_rows_single_point_falls_back() {
        let rows = predict_rows(&[series(&["9"])], &ForecastEngine::default());

        assert_eq!(rows[0].value, NEUTRAL_FORECAST);
        assert_eq!(rows[0].outcome, "insufficient_rows");
        assert_eq!(rows[0].details, "1 rows, need at least 2");
    }

    #[test]
    fn test_predict_rows_counts_coerced_values() {
        let rows = predict_rows(&[series(&["5", "NaNtext", "7"])], &ForecastEngine::default());

        assert_eq!(rows[0].coerced, 1);
        assert_eq!(rows[0].outcome, "modeled");
        assert!(rows[0].value.is_finite());
    }

    #[test]
    fn test_empty_series_has_no_forecast_instant() {
        let rows = predict_rows(&[series(&[])], &ForecastEngine::default());
        assert_eq!(rows[0].forecast_for, "-");
        assert_eq!(rows[0].outcome, "insufficient_rows");
    }
}
