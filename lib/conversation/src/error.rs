//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ThreadError`: Errors from thread history storage
//! - `ToolError`: Errors from tool execution

use std::fmt;

/// Errors from thread storage operations.
///
/// The in-memory store never fails. Stores backed by a database or files
/// report their failures as `StorageFailed`. Unknown threads are not an
/// error: `ThreadStore::history` returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "thread storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ThreadError {}

/// Errors from tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool not found.
    NotFound { name: String },
    /// Tool execution failed.
    ExecutionFailed { name: String, reason: String },
    /// Invalid tool input.
    InvalidInput { name: String, reason: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "tool not found: {name}"),
            Self::ExecutionFailed { name, reason } => {
                write!(f, "tool '{name}' execution failed: {reason}")
            }
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_error_display() {
        let err = ThreadError::StorageFailed {
            reason: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "thread storage failed: disk full");
    }

    #[test]
    fn tool_error_display() {
        let err = ToolError::InvalidInput {
            name: "get_warranty_form".to_string(),
            reason: "missing invoice_id".to_string(),
        };
        assert!(err.to_string().contains("get_warranty_form"));
        assert!(err.to_string().contains("missing invoice_id"));
    }
}
