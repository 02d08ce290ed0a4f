//! Envelope identifier generation and checking.

use uuid::Uuid;

use crate::IdError;

/// Longest identifier accepted in an envelope field.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Generates a fresh event identifier.
#[must_use]
pub fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a fresh correlation identifier for a new logical flow.
#[must_use]
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Checks that a caller-supplied identifier can travel in an envelope.
///
/// Any non-empty string of at most [`MAX_IDENTIFIER_LEN`] bytes without
/// whitespace or control characters is accepted. Generated identifiers are
/// UUIDs, but producers in other stacks may use their own schemes.
pub fn check_identifier(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_IDENTIFIER_LEN {
        return Err(IdError::TooLong {
            len: s.len(),
            max: MAX_IDENTIFIER_LEN,
        });
    }
    if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(IdError::IllegalCharacter);
    }
    Ok(())
}

/// Returns true if `s` is a well-formed envelope identifier.
#[must_use]
pub fn is_valid_identifier(s: &str) -> bool {
    check_identifier(s).is_ok()
}
