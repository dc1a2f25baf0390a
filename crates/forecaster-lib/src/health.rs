//! Component health for the forecaster's liveness and readiness probes
//!
//! Every forecast pass reports, per component, how many operations it
//! attempted and how many failed. A component is degraded when some of
//! them failed and unhealthy when all of them did.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Some operations in the last pass failed
    Degraded,
    /// Every operation in the last pass failed
    Unhealthy,
}

impl ComponentStatus {
    /// Status for `failed` failures out of `attempted` operations
    pub fn from_failures(failed: usize, attempted: usize) -> Self {
        if failed == 0 {
            ComponentStatus::Healthy
        } else if failed >= attempted {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        }
    }
}

/// A component's state after the last pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub attempted: usize,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    /// Nothing attempted yet
    pub fn idle() -> Self {
        Self::from_pass(0, 0, "operations")
    }

    /// Outcome of `attempted` operations of kind `what`, `failed` of which failed
    pub fn from_pass(failed: usize, attempted: usize, what: &str) -> Self {
        let status = ComponentStatus::from_failures(failed, attempted);
        let message = (failed > 0).then(|| format!("{} of {} {} failed", failed, attempted, what));
        Self {
            status,
            message,
            failed,
            attempted,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pass_timestamp: Option<i64>,
}

impl HealthResponse {
    /// Worst status across components
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }

    fn unhealthy_components(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|(_, c)| c.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    /// Range queries against Prometheus
    pub const SOURCE: &str = "source";
    /// Pushes to the Pushgateway
    pub const SINK: &str = "sink";
    /// Model fits
    pub const ENGINE: &str = "engine";
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    last_pass_timestamp: Option<i64>,
}

/// Shared health state, written by the pipeline and read by the probes
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a component; it stays healthy until a pass reports on it
    pub async fn register(&self, name: &str) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::idle());
    }

    /// Record a component's failures from the latest pass
    pub async fn record(&self, name: &str, failed: usize, attempted: usize, what: &str) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::from_pass(failed, attempted, what));
    }

    /// Current status of one component
    pub async fn status(&self, name: &str) -> Option<ComponentStatus> {
        self.state.read().await.components.get(name).map(|h| h.status)
    }

    /// Note that a full pass finished at `timestamp`
    pub async fn mark_pass_complete(&self, timestamp: i64) {
        self.state.write().await.last_pass_timestamp = Some(timestamp);
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: HealthResponse::compute_status(&state.components),
            components: state.components.clone(),
            last_pass_timestamp: state.last_pass_timestamp,
        }
    }

    /// Ready once a pass has completed and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let health = self.health().await;

        let reason = if health.last_pass_timestamp.is_none() {
            Some("No forecast pass completed yet".to_string())
        } else {
            let unhealthy = health.unhealthy_components();
            (!unhealthy.is_empty()).then(|| format!("Unhealthy: {}", unhealthy.join(", ")))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
