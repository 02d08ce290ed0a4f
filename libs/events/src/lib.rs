//! # unison-events
//!
//! The wire format every inter-service message on the Unison platform
//! conforms to.
//!
//! ## Design Principles
//!
//! - An envelope is fully defaulted and validated before it exists; there
//!   is no partially valid envelope
//! - Only `data` and `metadata` are mutable, and only by the producer that
//!   owns the instance before it is handed to a transport
//! - Event types and priorities are closed vocabularies serialized as
//!   strings
//!
//! ## Event Envelope
//!
//! All events share a common envelope with:
//! - Identification (`event_id`, `event_type`, `event_version`, `timestamp`)
//! - Source (`source_service`, `source_instance`)
//! - Correlation (`correlation_id`, `causation_id`)
//! - Routing (`topic`, `reply_to`, `priority`, `ttl`)
//! - Payload (`data`, `metadata`)
//! - Security (`auth_token`, `encrypted_fields`)
//!
//! ## Domain Events
//!
//! [`IntentEvent`], [`ContextEvent`], [`ExperienceEvent`] and [`GoalEvent`]
//! add typed fields on top of the envelope and default its event type and
//! topic.

mod domain;
mod envelope;
mod error;
mod topics;
mod types;

pub use domain::*;
pub use envelope::{
    validate_event_schema, EventEnvelope, EventEnvelopeBuilder, Payload, TraceContext,
    DEFAULT_EVENT_VERSION, DEFAULT_SOURCE_INSTANCE,
};
pub use error::SchemaValidationError;
pub use topics::*;
pub use types::*;
