//! Error types for the knowledge crate.

use std::fmt;

/// Errors from vector storage and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    /// A vector did not match the collection's dimensionality.
    DimensionMismatch { expected: usize, actual: usize },
    /// Collection names become file names, so they are restricted.
    InvalidCollectionName { name: String },
    /// Reading or writing a collection file failed.
    Io { path: String, reason: String },
    /// A collection file could not be decoded.
    Corrupt { path: String, reason: String },
    /// The embedding backend failed.
    EmbeddingFailed { collection: String },
    /// The embedding backend returned a different number of vectors than inputs.
    EmbeddingCountMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },
    /// Nothing to ingest.
    EmptyDocument,
}

impl fmt::Display for KnowledgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "vector has {actual} dimensions, collection expects {expected}")
            }
            Self::InvalidCollectionName { name } => write!(
                f,
                "invalid collection name '{name}': use letters, digits, '-' or '_'"
            ),
            Self::Io { path, reason } => write!(f, "I/O error on {path}: {reason}"),
            Self::Corrupt { path, reason } => {
                write!(f, "collection file {path} is corrupt: {reason}")
            }
            Self::EmbeddingFailed { collection } => {
                write!(f, "embedding failed for collection '{collection}'")
            }
            Self::EmbeddingCountMismatch {
                collection,
                expected,
                actual,
            } => write!(
                f,
                "embedding for collection '{collection}' returned {actual} vectors for {expected} inputs"
            ),
            Self::EmptyDocument => write!(f, "document contains no text"),
        }
    }
}

impl std::error::Error for KnowledgeError {}
