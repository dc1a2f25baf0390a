//! Daemon health commands

use anyhow::Result;
use colored::Colorize;
use forecaster_lib::{HealthResponse, ReadinessResponse};
use serde::Serialize;
use tabled::Tabled;

use crate::client::DaemonClient;
use crate::output::{color_status, print_success, print_warning, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failed")]
    failed: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

#[derive(Serialize)]
struct HealthReport {
    health: HealthResponse,
    readiness: ReadinessResponse,
}

/// Show the daemon's health and readiness
pub async fn show_health(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let (_, health): (u16, HealthResponse) = client.probe("healthz").await?;
    let (_, readiness): (u16, ReadinessResponse) = client.probe("readyz").await?;

    match format {
        OutputFormat::Json => {
            let report = HealthReport { health, readiness };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", "Forecaster Health".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Status:    {}",
                color_status(&format!("{:?}", health.status).to_lowercase())
            );
            if readiness.ready {
                println!("Readiness: {}", color_status("ready"));
            } else {
                println!("Readiness: {}", color_status("not ready"));
            }
            if let Some(last_pass) = health.last_pass_timestamp {
                println!("Last pass: {}", format_timestamp(last_pass));
            }
            println!();

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&format!("{:?}", component.status).to_lowercase()),
                    failed: format!("{}/{}", component.failed, component.attempted),
                    message: component.message.clone().unwrap_or_default(),
                    last_check: format_timestamp(component.last_check_timestamp),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            match readiness.reason {
                Some(reason) => print_warning(&reason),
                None => print_success("Forecaster is serving"),
            }
        }
    }

    Ok(())
}

fn format_timestamp(epoch_secs: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[tokio::test]
    async fn test_show_health_against_mock_daemon() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_body(
                r#"{"status":"degraded","components":{"sink":{"status":"degraded","message":"1 of 3 pushes failed","failed":1,"attempted":3,"last_check_timestamp":1700000000}},"last_pass_timestamp":1700000000}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/readyz")
            .with_status(200)
            .with_body(r#"{"ready":true}"#)
            .create_async()
            .await;

        let client = DaemonClient::new(&server.url()).unwrap();
        show_health(&client, OutputFormat::Json).await.unwrap();
        show_health(&client, OutputFormat::Table).await.unwrap();
    }
}
