//! Error types for the forecasting pipeline
//!
//! Each external boundary has its own error so callers can tell which
//! path produced a fallback. Only [`ConfigError`] is fatal; everything
//! else is recovered inside a pass.

use thiserror::Error;

/// Failure to fetch a range query from the metrics source
#[derive(Debug, Clone, Error)]
pub enum SourceQueryError {
    #[error("Transport error querying {query}: {message}")]
    Transport { query: String, message: String },

    #[error("HTTP status {status} querying {query}")]
    Status { query: String, status: u16 },

    #[error("Query {query} returned status {status}: {message}")]
    Api {
        query: String,
        status: String,
        message: String,
    },

    #[error("Failed to decode response for {query}: {message}")]
    Decode { query: String, message: String },
}

/// Failure to fit a model or produce a prediction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("Insufficient data: required {required}, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("Degenerate time axis: all {rows} timestamps coincide")]
    DegenerateAxis { rows: usize },

    #[error("Singular system while solving for {parameters} parameters")]
    Singular { parameters: usize },

    #[error("Model produced a non-finite prediction")]
    NonFinite,

    #[error("Model error: {0}")]
    Model(String),
}

/// Failure to deliver a forecast to the sink
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode gauge: {0}")]
    Encode(String),

    #[error("Transport error pushing to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Push to {url} rejected with HTTP status {status}: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },
}

/// Configuration errors, raised before any pass starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid URL for {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_error_display() {
        let error = FitError::InsufficientData {
            required: 2,
            got: 1,
        };
        assert_eq!(error.to_string(), "Insufficient data: required 2, got 1");

        let error = FitError::DegenerateAxis { rows: 4 };
        assert_eq!(
            error.to_string(),
            "Degenerate time axis: all 4 timestamps coincide"
        );
    }

    #[test]
    fn test_source_error_display() {
        let error = SourceQueryError::Status {
            query: "container_processes".to_string(),
            status: 503,
        };
        assert_eq!(
            error.to_string(),
            "HTTP status 503 querying container_processes"
        );
    }

    #[test]
    fn test_publish_error_display() {
        let error = PublishError::Rejected {
            url: "http://pushgateway:9091/metrics/job/cadvisor_forecast".to_string(),
            status: 400,
            body: "bad label".to_string(),
        };
        assert!(error.to_string().contains("HTTP status 400"));
        assert!(error.to_string().contains("bad label"));
    }
}
