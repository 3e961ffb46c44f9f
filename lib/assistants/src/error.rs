//! Error types for the assistants crate.

use std::fmt;
use switchboard_core::ValidationError;

/// Errors surfaced by assistant entry points.
///
/// `InvalidInput` and `UnsupportedUpload` are caller mistakes; every other
/// variant is a server-side failure and carries its cause in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantError {
    /// A request field failed validation.
    InvalidInput(ValidationError),
    /// An uploaded file is not of the expected kind.
    UnsupportedUpload { reason: String },
    /// A model call failed.
    ModelCall { step: &'static str },
    /// An upstream service did not answer.
    Unavailable { service: &'static str },
    /// The routing graph failed.
    Graph { assistant: &'static str },
    /// Similarity lookup failed.
    Retrieval { collection: String },
    /// Conversation history could not be read or written.
    ThreadStore,
    /// A database operation failed.
    Database { reason: String },
    /// Generated SQL was refused before execution.
    UnsafeSql { sql: String },
    /// Text could not be extracted from a document.
    Document { reason: String },
    /// The employee roster could not be loaded.
    Roster { path: String, reason: String },
}

impl AssistantError {
    /// Returns true for errors caused by the request itself.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::UnsupportedUpload { .. })
    }
}

impl From<ValidationError> for AssistantError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err)
    }
}

impl fmt::Display for AssistantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::UnsupportedUpload { reason } => write!(f, "unsupported upload: {reason}"),
            Self::ModelCall { step } => write!(f, "model call failed during {step}"),
            Self::Unavailable { service } => {
                write!(f, "Failed to get a response from the {service} service.")
            }
            Self::Graph { assistant } => write!(f, "{assistant} graph failed"),
            Self::Retrieval { collection } => {
                write!(f, "retrieval from '{collection}' failed")
            }
            Self::ThreadStore => write!(f, "conversation history unavailable"),
            Self::Database { reason } => write!(f, "database error: {reason}"),
            Self::UnsafeSql { sql } => write!(f, "refusing to run non-SELECT statement: {sql}"),
            Self::Document { reason } => write!(f, "could not read document: {reason}"),
            Self::Roster { path, reason } => {
                write!(f, "could not load employee roster {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for AssistantError {}
