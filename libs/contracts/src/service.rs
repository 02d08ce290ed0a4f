//! The base contract every platform service implements.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn, Instrument};
use unison_events::EventEnvelope;

use crate::{ContractError, HealthResponse, HealthStatus, ServiceInfo, ServiceMetrics};

/// Minimal interface that makes a service addressable by the platform.
///
/// Methods are invoked concurrently (one call per inbound message or
/// probe). Implementations guard their own shared state.
#[async_trait]
pub trait ServiceContract: Send + Sync {
    /// Current health. Must not mutate service state or block on I/O.
    async fn health(&self) -> HealthResponse;

    /// Single entry point for inbound events.
    ///
    /// Returns `Ok(None)` when no reply is warranted. Event types the
    /// service does not recognize must be ignored, not reported as errors.
    async fn handle_event(
        &self,
        envelope: EventEnvelope,
    ) -> Result<Option<EventEnvelope>, ContractError>;

    /// Static or near-static metadata.
    fn get_service_info(&self) -> ServiceInfo;

    /// Point-in-time metrics snapshot.
    async fn get_metrics(&self) -> ServiceMetrics;

    /// Starts the service. Calling it on a running service is a no-op.
    async fn start(&self) -> Result<(), ContractError>;

    /// Stops the service and releases everything `start` acquired, even
    /// if `start` only partially completed. Idempotent.
    async fn stop(&self) -> Result<(), ContractError>;

    /// Checks the current configuration without changing it.
    fn validate_configuration(&self) -> bool;
}

/// Hands one inbound envelope to a service.
///
/// Expired envelopes are dropped without reaching the handler. Handler
/// failures are logged and swallowed so the caller's dispatch loop keeps
/// running.
pub async fn dispatch_event<S>(service: &S, envelope: EventEnvelope) -> Option<EventEnvelope>
where
    S: ServiceContract + ?Sized,
{
    let span = envelope.span();
    async move {
        if envelope.is_expired() {
            debug!(ttl = ?envelope.ttl(), "dropping expired event");
            return None;
        }
        match service.handle_event(envelope).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, error_type = e.error_type(), "event handler failed");
                None
            }
        }
    }
    .instrument(span)
    .await
}

/// Calls `health()` under a deadline.
///
/// A probe that does not answer in time is reported as unhealthy on the
/// service's behalf.
pub async fn probe_health<S>(service: &S, timeout: Duration) -> HealthResponse
where
    S: ServiceContract + ?Sized,
{
    match tokio::time::timeout(timeout, service.health()).await {
        Ok(health) => health,
        Err(_) => {
            let info = service.get_service_info();
            warn!(service = %info.name, ?timeout, "health probe timed out");
            HealthResponse::new(HealthStatus::Unhealthy, info.name, info.version)
                .with_metadata("reason", "health check timed out")
        }
    }
}
