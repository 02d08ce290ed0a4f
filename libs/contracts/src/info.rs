//! Service metadata and metrics snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unison_events::{EventType, Payload};

/// Service metadata and capabilities. Safe to expose unauthenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Platform domain the service belongs to, e.g. `intent`, `context`.
    pub domain: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Names of services this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub supported_events: Vec<EventType>,
    /// Configuration schema.
    #[serde(default)]
    pub configuration: Payload,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            domain: domain.into(),
            capabilities: Vec::new(),
            endpoints: Vec::new(),
            dependencies: Vec::new(),
            supported_events: Vec::new(),
            configuration: Payload::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    pub fn with_dependency(mut self, service: impl Into<String>) -> Self {
        self.dependencies.push(service.into());
        self
    }

    pub fn with_supported_events(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.supported_events.extend(events);
        self
    }

    pub fn with_configuration(mut self, schema: Payload) -> Self {
        self.configuration = schema;
        self
    }

    pub fn supports(&self, event_type: EventType) -> bool {
        self.supported_events.contains(&event_type)
    }
}

/// Point-in-time performance snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub error_count: u64,
    /// Average response time in milliseconds.
    #[serde(default)]
    pub average_response_time: f64,
    #[serde(default)]
    pub memory_usage_mb: f64,
    #[serde(default)]
    pub cpu_usage_percent: f64,
    #[serde(default)]
    pub active_connections: u64,
    /// Messages waiting to be handled.
    #[serde(default)]
    pub queue_depth: u64,
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            request_count: 0,
            error_count: 0,
            average_response_time: 0.0,
            memory_usage_mb: 0.0,
            cpu_usage_percent: 0.0,
            active_connections: 0,
            queue_depth: 0,
        }
    }
}

impl ServiceMetrics {
    /// Fraction of requests that failed, 0.0 when nothing was served.
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.request_count as f64
    }
}
