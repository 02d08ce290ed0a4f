use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::ContractError;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub service_version: String,
    pub instance_id: String,
    pub listen_addr: SocketAddr,
    pub log_level: String,
    /// Deadline orchestration tooling applies to `/health`.
    pub health_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let service_name =
            lookup("UNISON_SERVICE_NAME").unwrap_or_else(|| "unison-service".to_string());

        let service_version = lookup("UNISON_SERVICE_VERSION")
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        let instance_id = lookup("UNISON_INSTANCE_ID").unwrap_or_else(|| "default".to_string());

        let listen_addr = lookup("UNISON_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = lookup("UNISON_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let health_timeout = match lookup("UNISON_HEALTH_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(ms.parse()?),
            None => Duration::from_secs(3),
        };

        Ok(Self {
            service_name,
            service_version,
            instance_id,
            listen_addr,
            log_level,
            health_timeout,
        })
    }

    /// Checks the configuration without modifying it.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.service_name.trim().is_empty() {
            return Err(ContractError::validation("service_name", "must not be empty"));
        }
        if self.service_version.trim().is_empty() {
            return Err(ContractError::validation("service_version", "must not be empty"));
        }
        if self.instance_id.trim().is_empty() {
            return Err(ContractError::validation("instance_id", "must not be empty"));
        }
        if self.health_timeout.is_zero() {
            return Err(ContractError::validation("health_timeout", "must be positive"));
        }
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| ContractError::validation("log_level", e.to_string()))?;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
