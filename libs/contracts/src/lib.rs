//! # unison-contracts
//!
//! Behavioral contracts every Unison platform service implements, and the
//! value objects they exchange with orchestration tooling.
//!
//! ## Contracts
//!
//! - [`ServiceContract`] is the base every service implements: health,
//!   event handling, service info, metrics and lifecycle
//! - Domain contracts ([`IntentProcessingContract`],
//!   [`ContextManagementContract`], [`ExperienceGenerationContract`],
//!   [`AgentVdiContract`], [`InferenceContract`]) are implemented as needed
//!
//! Contract methods report capability failures as [`ContractError`];
//! transport failures are the caller's concern.
//!
//! ## Helpers
//!
//! - [`Lifecycle`] and [`ResourceStack`] for idempotent start and stop
//! - [`MetricsRecorder`] for the counters behind `get_metrics()`
//! - [`ServiceConfig`] and [`telemetry::init`] for process setup
//! - [`http::routes`] for the shared `/health` and `/events` endpoints

mod config;
mod domains;
mod error;
mod health;
pub mod http;
mod info;
mod lifecycle;
mod merge;
mod metrics;
mod service;
pub mod telemetry;

pub use config::ServiceConfig;
pub use domains::{
    AgentVdiContract, ContextManagementContract, ExperienceGenerationContract, InferenceContract,
    IntentProcessingContract, Record, DEFAULT_CAPTURE_FORMAT, DEFAULT_EXPERIENCE_TYPE,
};
pub use error::{parse_id, require_non_empty, ContractError};
pub use health::{HealthResponse, HealthStatus};
pub use info::{ServiceInfo, ServiceMetrics};
pub use lifecycle::{Lifecycle, LifecycleState, ResourceStack};
pub use merge::MergeStrategy;
pub use metrics::{ConnectionGuard, MetricsRecorder, RequestTimer};
pub use service::{dispatch_event, probe_health, ServiceContract};
