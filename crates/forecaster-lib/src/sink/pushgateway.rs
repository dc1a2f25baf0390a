//! Pushgateway sink

use super::{sanitize_labels, ForecastSink, DEFAULT_JOB, GAUGE_HELP, GAUGE_NAME};
use crate::error::{ConfigError, PublishError};
use crate::models::ForecastResult;
use crate::source::base_url;
use async_trait::async_trait;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for a single push
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// How a push interacts with metrics already stored for the job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushMode {
    /// HTTP PUT: replaces every metric in the job's group
    #[default]
    Replace,
    /// HTTP POST: replaces only metrics with the same name
    Merge,
}

impl fmt::Display for PushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushMode::Replace => write!(f, "replace"),
            PushMode::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for PushMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" | "put" => Ok(PushMode::Replace),
            "merge" | "post" => Ok(PushMode::Merge),
            other => Err(format!("unknown push mode '{}', expected replace or merge", other)),
        }
    }
}

/// Configuration for the Pushgateway sink
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Base URL, e.g. `http://pushgateway:9091`
    pub url: String,
    pub job: String,
    pub mode: PushMode,
    pub timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: "http://pushgateway:9091".to_string(),
            job: DEFAULT_JOB.to_string(),
            mode: PushMode::default(),
            timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }
}

/// Encode a forecast as a single gauge in the text exposition format
pub fn encode_gauge(result: &ForecastResult) -> Result<String, PublishError> {
    let encode_err = |e: prometheus::Error| PublishError::Encode(e.to_string());

    let labels = sanitize_labels(&result.labels);
    let registry = Registry::new();
    let opts = Opts::new(GAUGE_NAME, GAUGE_HELP);

    if labels.is_empty() {
        let gauge = Gauge::with_opts(opts).map_err(encode_err)?;
        gauge.set(result.value);
        registry.register(Box::new(gauge)).map_err(encode_err)?;
    } else {
        let names: Vec<&str> = labels.keys().collect();
        let values: Vec<&str> = labels.values().collect();
        let gauge = GaugeVec::new(opts, &names).map_err(encode_err)?;
        gauge
            .get_metric_with_label_values(&values)
            .map_err(encode_err)?
            .set(result.value);
        registry.register(Box::new(gauge)).map_err(encode_err)?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .map_err(encode_err)?;
    String::from_utf8(buffer).map_err(|e| PublishError::Encode(e.to_string()))
}

/// Pushes forecasts to a Prometheus Pushgateway
pub struct PushgatewaySink {
    client: Client,
    push_url: Url,
    mode: PushMode,
}

impl PushgatewaySink {
    pub fn new(config: &SinkConfig) -> Result<Self, ConfigError> {
        if config.job.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "push_job",
                reason: "job name must not be empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Load(format!("failed to create HTTP client: {}", e)))?;

        let mut push_url = base_url("pushgateway_url", &config.url)?;
        push_url
            .path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl {
                name: "pushgateway_url",
                value: config.url.clone(),
            })?
            .pop_if_empty()
            .extend(["metrics", "job", config.job.as_str()]);

        Ok(Self {
            client,
            push_url,
            mode: config.mode,
        })
    }

    /// Full URL pushes are sent to
    pub fn push_url(&self) -> &Url {
        &self.push_url
    }
}

#[async_trait]
impl ForecastSink for PushgatewaySink {
    async fn publish(&self, result: &ForecastResult) -> Result<(), PublishError> {
        let body = encode_gauge(result)?;

        let request = match self.mode {
            PushMode::Replace => self.client.put(self.push_url.clone()),
            PushMode::Merge => self.client.post(self.push_url.clone()),
        };

        let response = request
            .header("content-type", prometheus::TEXT_FORMAT)
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Transport {
                url: self.push_url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                url: self.push_url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            url = %self.push_url,
            mode = %self.mode,
            value = result.value,
            "Pushed forecast"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelSet;
    use crate::predictor::{FallbackReason, ForecastOutcome};
    use mockito::Matcher;

    fn sink_for(url: String, mode: PushMode) -> PushgatewaySink {
        PushgatewaySink::new(&SinkConfig {
            url,
            mode,
            timeout: Duration::from_secs(2),
            ..SinkConfig::default()
        })
        .unwrap()
    }

    fn pod_result(value: f64) -> ForecastResult {
        let labels: LabelSet = [
            ("__name__", "container_memory_usage_bytes"),
            ("pod", "web-0"),
            ("namespace", "default"),
        ]
        .into_iter()
        .collect();
        ForecastResult::new(ForecastOutcome::Modeled(value), labels)
    }

    #[test]
    fn test_encode_gauge_with_labels() {
        let text = encode_gauge(&pod_result(12.5)).unwrap();

        assert!(text.contains("# TYPE predicted_usage gauge"));
        assert!(text.contains("# HELP predicted_usage Forecasted usage by ML model"));
        assert!(text.contains(
            r#"predicted_usage{metric="container_memory_usage_bytes",namespace="default",pod="web-0"} 12.5"#
        ));
    }

    #[test]
    fn test_encode_gauge_without_labels() {
        let result = ForecastResult::new(
            ForecastOutcome::Fallback(FallbackReason::NoSeries),
            LabelSet::new(),
        );
        let text = encode_gauge(&result).unwrap();
        assert!(text.contains("predicted_usage 0.5"));
    }

    #[test]
    fn test_push_url() {
        let sink = sink_for("http://pushgateway:9091".to_string(), PushMode::Replace);
        assert_eq!(
            sink.push_url().as_str(),
            "http://pushgateway:9091/metrics/job/cadvisor_forecast"
        );
    }

    #[test]
    fn test_empty_job_rejected() {
        let result = PushgatewaySink::new(&SinkConfig {
            job: " ".to_string(),
            ..SinkConfig::default()
        });
        assert!(matches!(result, Err(ConfigError::Invalid { name: "push_job", .. })));
    }

    #[test]
    fn test_push_mode_parsing() {
        assert_eq!("PUT".parse::<PushMode>().unwrap(), PushMode::Replace);
        assert_eq!("merge".parse::<PushMode>().unwrap(), PushMode::Merge);
        assert!("append".parse::<PushMode>().is_err());
    }

    #[tokio::test]
    async fn test_publish_replace_uses_put() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/metrics/job/cadvisor_forecast")
            .match_header("content-type", Matcher::Regex("text/plain".to_string()))
            .match_body(Matcher::Regex(r#"pod="web-0"\} 12\.5"#.to_string()))
            .with_status(200)
            .create_async()
            .await;

        sink_for(server.url(), PushMode::Replace)
            .publish(&pod_result(12.5))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_merge_uses_post() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/metrics/job/cadvisor_forecast")
            .with_status(202)
            .create_async()
            .await;

        sink_for(server.url(), PushMode::Merge)
            .publish(&pod_result(1.0))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/metrics/job/cadvisor_forecast")
            .with_status(400)
            .with_body("text format parsing error")
            .create_async()
            .await;

        let err = sink_for(server.url(), PushMode::Replace)
            .publish(&pod_result(1.0))
            .await
            .unwrap_err();

        match err {
            PublishError::Rejected { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "text format parsing error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
