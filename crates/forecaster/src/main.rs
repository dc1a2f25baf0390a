//! cAdvisor Forecaster - container metric forecasting daemon
//!
//! Periodically queries cAdvisor series from Prometheus, forecasts each one
//! and pushes the `predicted_usage` gauge to a Pushgateway.

use anyhow::{Context, Result};
use cadvisor_forecaster::{api, config::ForecasterConfig};
use forecaster_lib::{
    health::{components, HealthRegistry},
    observability::{ForecasterMetrics, StructuredLogger},
    pipeline::OrchestratorBuilder,
    predictor::ForecastEngine,
    sink::PushgatewaySink,
    source::PrometheusSource,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const FORECASTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ForecasterConfig::load().context("Failed to load configuration")?;
    info!(
        prometheus = %config.prometheus_url,
        pushgateway = %config.pushgateway_url,
        instance = %config.instance,
        "Forecaster configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::SOURCE).await;
    health_registry.register(components::SINK).await;
    health_registry.register(components::ENGINE).await;

    let metrics = ForecasterMetrics::new();
    let logger = StructuredLogger::new(&config.instance);

    let source = PrometheusSource::new(&config.source_config())
        .context("Failed to create Prometheus source")?;
    let sink = PushgatewaySink::new(&config.sink_config()?)
        .context("Failed to create Pushgateway sink")?;
    let engine = ForecastEngine::new(config.engine_config()?);

    logger.log_startup(
        FORECASTER_VERSION,
        engine.model_name(),
        config.forecast_metrics.len(),
    );

    let orchestrator = OrchestratorBuilder::new()
        .source(Arc::new(source))
        .sink(Arc::new(sink))
        .engine(engine)
        .config(config.pipeline_config())
        .logger(logger.clone())
        .health(health_registry.clone())
        .build()?;

    let Some(every) = config.interval() else {
        let report = orchestrator.run_pass().await;
        logger.log_shutdown("single pass complete");
        info!(
            published = report.published,
            fallbacks = report.fallback_total(),
            clean = report.is_clean(),
            "Exiting after single pass"
        );
        return Ok(());
    };

    let app_state = Arc::new(api::AppState::new(health_registry, metrics));
    let api_handle = tokio::spawn(api::serve(config.forecast_api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(async move { orchestrator.run(every, shutdown_rx).await });

    let signal = shutdown_signal().await?;
    logger.log_shutdown(&format!("{} received", signal));

    // Receiver may already be gone if the loop exited
    let _ = shutdown_tx.send(());
    loop_handle.await.context("Forecast loop panicked")?;
    api_handle.abort();

    Ok(())
}

/// Wait for SIGINT or SIGTERM and return the signal's name
#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for SIGINT")?;
            Ok("SIGINT")
        }
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    Ok("Ctrl-C")
}
