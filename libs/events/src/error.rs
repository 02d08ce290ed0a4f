//! Error types for envelope construction and validation.

use thiserror::Error;

/// Errors raised while constructing or decoding an event.
///
/// Every variant names the offending field so producers can surface it to
/// the immediate caller. Nothing is ever partially applied: when one of
/// these is returned, no envelope exists.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaValidationError {
    /// A required field was not supplied.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// A field holds a value outside its closed set or format.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    /// A numeric field is outside its declared range.
    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The document could not be decoded at all.
    #[error("malformed event document: {0}")]
    Malformed(String),
}

impl SchemaValidationError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        SchemaValidationError::InvalidValue {
            field,
            message: message.into(),
        }
    }

    /// The field this error refers to, if it refers to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SchemaValidationError::MissingField { field }
            | SchemaValidationError::InvalidValue { field, .. }
            | SchemaValidationError::OutOfRange { field, .. } => Some(field),
            SchemaValidationError::Malformed(_) => None,
        }
    }
}

impl From<serde_json::Error> for SchemaValidationError {
    fn from(err: serde_json::Error) -> Self {
        SchemaValidationError::Malformed(err.to_string())
    }
}

/// Checks that a required string field is present and not blank.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), SchemaValidationError> {
    if value.trim().is_empty() {
        return Err(SchemaValidationError::MissingField { field });
    }
    Ok(())
}

/// Checks a caller-supplied envelope identifier.
pub(crate) fn require_identifier(
    field: &'static str,
    value: &str,
) -> Result<(), SchemaValidationError> {
    unison_id::check_identifier(value).map_err(|e| {
        if e.is_empty() {
            SchemaValidationError::MissingField { field }
        } else {
            SchemaValidationError::invalid(field, e.to_string())
        }
    })
}
