//! Forecasting library for cAdvisor container metrics
//!
//! This crate provides the core functionality for:
//! - Range queries against Prometheus
//! - Series loading and value coercion
//! - Trend forecasting with a neutral fallback
//! - Publishing forecasts to a Pushgateway
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod loader;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod sink;
pub mod source;

pub use error::{ConfigError, FitError, PublishError, SourceQueryError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ForecasterMetrics, StructuredLogger};
pub use pipeline::{Orchestrator, OrchestratorBuilder, PassReport, PipelineConfig};
