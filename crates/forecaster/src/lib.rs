//! cAdvisor forecaster daemon
//!
//! Configuration loading and the health/metrics HTTP API. The binary in
//! `main.rs` wires these to the forecast pipeline.

pub mod api;
pub mod config;
