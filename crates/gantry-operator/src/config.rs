//! Operator configuration.
//!
//! Typed config with environment overrides; there is no CLI surface here.
//! Embedding binaries either deserialize this from their config file or
//! rely on the env-driven defaults.

use serde::Deserialize;

use gantry_common::telemetry::TelemetryConfig;

/// Default number of workers per controller
const DEFAULT_WORKERS: usize = 2;

/// Default domain for managed hosts
const DEFAULT_MANAGED_DOMAIN: &str = "edge.gantry.dev";

/// Top-level operator configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Worker loops per controller
    pub workers: usize,

    /// Domain under which managed hosts are allocated
    pub managed_domain: String,

    /// OTLP endpoint for traces and metrics (None = local-only telemetry)
    pub otlp_endpoint: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            workers: std::env::var("GANTRY_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WORKERS),
            managed_domain: std::env::var("GANTRY_MANAGED_DOMAIN")
                .unwrap_or_else(|_| DEFAULT_MANAGED_DOMAIN.to_string()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        }
    }
}

impl OperatorConfig {
    /// Telemetry configuration for the given service name
    pub fn telemetry(&self, service_name: impl Into<String>) -> TelemetryConfig {
        TelemetryConfig {
            service_name: service_name.into(),
            otlp_endpoint: self.otlp_endpoint.clone(),
        }
    }
}
