//! HTTP client for the forecaster daemon's health API

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

/// Client for the daemon's `/healthz` and `/readyz` endpoints
pub struct DaemonClient {
    client: Client,
    base_url: Url,
}

impl DaemonClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid daemon URL")?;

        Ok(Self { client, base_url })
    }

    /// GET a probe endpoint.
    ///
    /// Probes answer 503 with a JSON body when not ready, so any status
    /// with a decodable body is returned alongside the status code.
    pub async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        let parsed = serde_json::from_str(&body)
            .with_context(|| format!("Unexpected response ({}): {}", status, body))?;

        Ok((status.as_u16(), parsed))
    }
}
