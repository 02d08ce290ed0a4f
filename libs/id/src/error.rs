//! Identifier parsing errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,

    /// The identifier belongs to another kind of record, or has no prefix.
    #[error("expected a '{expected}_' identifier, got '{input}'")]
    WrongKind {
        expected: &'static str,
        input: String,
    },

    #[error("'{body}' is not a valid ULID")]
    InvalidBody { body: String },

    #[error("identifier is {len} bytes, at most {max} are allowed")]
    TooLong { len: usize, max: usize },

    #[error("identifier contains whitespace or control characters")]
    IllegalCharacter,
}

impl IdError {
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }

    pub fn is_wrong_kind(&self) -> bool {
        matches!(self, IdError::WrongKind { .. })
    }
}
