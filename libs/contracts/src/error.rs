//! Capability-level errors raised by contract implementers.

use thiserror::Error;
use unison_events::SchemaValidationError;
use unison_id::{RecordId, RecordKind};

/// A capability failure, as opposed to a transport or network failure.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The caller supplied an unusable argument.
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// An event failed schema validation.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    /// The referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The service does not offer this capability or option.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A dependency the capability needs is not reachable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ContractError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ContractError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ContractError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable code reported as `error.type` at the HTTP boundary.
    pub fn error_type(&self) -> &'static str {
        match self {
            ContractError::Validation { .. } | ContractError::Schema(_) => "validation_failed",
            ContractError::NotFound { .. } => "not_found",
            ContractError::Unsupported(_) => "unsupported",
            ContractError::Unavailable(_) => "unavailable",
            ContractError::Internal(_) => "internal",
        }
    }

    /// HTTP status code for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            ContractError::Validation { .. } | ContractError::Schema(_) => 400,
            ContractError::NotFound { .. } => 404,
            ContractError::Unsupported(_) => 501,
            ContractError::Unavailable(_) => 503,
            ContractError::Internal(_) => 500,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ContractError::Validation { .. } | ContractError::Schema(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContractError::NotFound { .. })
    }

    /// The offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            ContractError::Validation { field, .. } => Some(field),
            ContractError::Schema(e) => e.field(),
            _ => None,
        }
    }
}

/// Rejects empty or whitespace-only arguments.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Parses a record identifier received as a plain string, e.g. from a
/// request body or a record returned by another service.
pub fn parse_id<K: RecordKind>(value: &str) -> Result<RecordId<K>, ContractError> {
    RecordId::parse(value).map_err(|e| ContractError::validation(K::FIELD, e.to_string()))
}
