//! Health check value objects.
//!
//! `health()` is called by liveness and readiness probes, so producing a
//! [`HealthResponse`] must never touch I/O on the caller's behalf.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unison_events::Payload;

/// Service health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
    #[default]
    Starting,
    Stopping,
}

impl HealthStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Starting => "starting",
            HealthStatus::Stopping => "stopping",
        }
    }

    /// Whether the service should keep receiving traffic.
    pub const fn is_serving(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_instance() -> String {
    "default".to_string()
}

/// Standard health check response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Service instance ID.
    #[serde(default = "default_instance")]
    pub instance: String,
    #[serde(default)]
    pub uptime_seconds: f64,
    /// Dependency name to its reported status.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: Payload,
}

impl HealthResponse {
    pub fn new(status: HealthStatus, service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            service: service.into(),
            version: version.into(),
            instance: default_instance(),
            uptime_seconds: 0.0,
            dependencies: BTreeMap::new(),
            metadata: Payload::new(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn with_uptime(mut self, uptime: Duration) -> Self {
        self.uptime_seconds = uptime.as_secs_f64();
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, status: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), status.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Downgrades a healthy status to degraded when any dependency reports
    /// something other than healthy.
    pub fn degrade_on_dependencies(mut self) -> Self {
        let all_healthy = self
            .dependencies
            .values()
            .all(|s| s == HealthStatus::Healthy.as_str());
        if self.status == HealthStatus::Healthy && !all_healthy {
            self.status = HealthStatus::Degraded;
        }
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
