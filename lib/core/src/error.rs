//! Shared error foundation.
//!
//! Crates define their own error enums and wrap them in
//! `rootcause::Report` as they propagate; the alias here keeps signatures
//! short. `ValidationError` covers request-shape problems that every
//! entry point checks the same way (blank text, malformed identifiers).

use rootcause::Report;
use std::fmt;

/// Result alias over a rootcause report with context type `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// A request field failed validation before any work was done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    Blank { field: &'static str },
    /// A field had an unusable value.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "'{field}' must not be empty"),
            Self::Invalid { field, reason } => write!(f, "invalid '{field}': {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Returns the trimmed value, or `ValidationError::Blank` when nothing is left.
pub fn require_text<'a>(field: &'static str, value: &'a str) -> std::result::Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(
            require_text("query", "   \n"),
            Err(ValidationError::Blank { field: "query" })
        );
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(require_text("query", "  sofa price?  "), Ok("sofa price?"));
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = ValidationError::Invalid {
            field: "thread_id",
            reason: "too long".to_string(),
        };
        assert_eq!(err.to_string(), "invalid 'thread_id': too long");
    }
}
