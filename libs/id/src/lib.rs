//! # unison-id
//!
//! Identifier generation and typed ID parsing for the Unison platform.
//!
//! ## Two kinds of identifiers
//!
//! - **Envelope identifiers** (`event_id`, `correlation_id`, `causation_id`)
//!   are opaque strings on the wire. Producers generate them as UUIDv4
//!   strings; consumers accept any well-formed identifier.
//! - **Record identifiers** (intents, goals, experiences, display sessions)
//!   are [`RecordId`]s written as `{prefix}_{ulid}`.
//!
//! Examples:
//! - `int_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `goal_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//! - `vdi_01HV4Z4NYPLTRS0JTUA8XDME5F`

mod error;
mod generate;
mod record;

pub use error::IdError;
pub use generate::*;
pub use record::*;
