//! CLI command implementations

pub mod health;
pub mod metrics;
pub mod predict;
pub mod query;

use crate::output::{color_outcome, format_value};
use forecaster_lib::ForecastResult;

/// Outcome label and human-readable details for a forecast
pub(crate) fn describe_outcome(result: &ForecastResult) -> (String, String) {
    match result.outcome.fallback_reason() {
        Some(reason) => (reason.as_str().to_string(), reason.to_string()),
        None => ("modeled".to_string(), String::new()),
    }
}

pub(crate) fn display_value(value: &f64) -> String {
    format_value(*value)
}

pub(crate) fn display_outcome(outcome: &str) -> String {
    color_outcome(outcome)
}
