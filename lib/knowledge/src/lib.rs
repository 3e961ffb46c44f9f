//! Retrieval support for switchboard assistants.
//!
//! Documents are split into overlapping chunks, embedded through an
//! [`switchboard_ai::EmbeddingBackend`], and stored in named
//! [`VectorCollection`]s. Retrieval embeds the query and returns the most
//! similar chunks by cosine similarity.

pub mod base;
pub mod collection;
pub mod error;
pub mod splitter;

pub use base::{KnowledgeBase, is_valid_collection_name, join_context};
pub use collection::{ScoredRecord, VectorCollection, VectorRecord, cosine_similarity};
pub use error::KnowledgeError;
pub use splitter::TextSplitter;
