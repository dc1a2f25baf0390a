//! Prometheus HTTP API source

use super::{MetricsSource, RangeQuery};
use crate::error::{ConfigError, SourceQueryError};
use crate::models::LabeledSeries;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for a single range query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the Prometheus source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL, e.g. `http://prometheus:9090`
    pub url: String,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "http://prometheus:9090".to_string(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType", default)]
    result_type: String,
    #[serde(default)]
    result: Vec<LabeledSeries>,
}

/// Range-query client for the Prometheus HTTP API
pub struct PrometheusSource {
    client: Client,
    base_url: Url,
}

impl PrometheusSource {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Load(format!("failed to create HTTP client: {}", e)))?;

        let base_url = base_url("prometheus_url", &config.url)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn query_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join("api/v1/query_range")
    }
}

/// Parse an endpoint and make sure relative joins keep its path
pub(crate) fn base_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn query_range(&self, query: &RangeQuery) -> Result<Vec<LabeledSeries>, SourceQueryError> {
        let url = self.query_url().map_err(|e| SourceQueryError::Transport {
            query: query.query.clone(),
            message: e.to_string(),
        })?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("query", query.query.as_str()),
                ("start", &query.start.to_string()),
                ("end", &query.end.to_string()),
                ("step", query.step.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceQueryError::Transport {
                query: query.query.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SourceQueryError::Status {
                query: query.query.clone(),
                status: response.status().as_u16(),
            });
        }

        let body: QueryResponse = response.json().await.map_err(|e| SourceQueryError::Decode {
            query: query.query.clone(),
            message: e.to_string(),
        })?;

        if body.status != "success" {
            return Err(SourceQueryError::Api {
                query: query.query.clone(),
                status: body.status,
                message: format!(
                    "{}: {}",
                    body.error_type.unwrap_or_else(|| "unknown".to_string()),
                    body.error.unwrap_or_default()
                ),
            });
        }

        let data = body.data.ok_or_else(|| SourceQueryError::Decode {
            query: query.query.clone(),
            message: "missing data field".to_string(),
        })?;

        debug!(
            query = %query.query,
            result_type = %data.result_type,
            series = data.result.len(),
            "Range query complete"
        );

        Ok(data.result)
    }
}
