//! In-memory vector collections with cosine search.
//!
//! A collection is a flat list of embedded chunks. Search scores every record
//! against the query vector, which is adequate for the document sizes the
//! assistants work with. Collections persist as one JSON file each.

use crate::error::KnowledgeError;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use switchboard_core::ChunkId;

/// One embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Chunk identifier.
    pub id: ChunkId,
    /// Original chunk text.
    pub content: String,
    /// Free-form metadata supplied at ingestion.
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
    /// Embedding vector.
    pub vector: Vec<f32>,
}

impl VectorRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(content: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: ChunkId::new(),
            content: content.into(),
            metadata: Map::new(),
            vector,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, JsonValue>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    /// The matching record.
    pub record: VectorRecord,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// A named set of vectors sharing one dimensionality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorCollection {
    /// Collection name.
    pub name: String,
    records: Vec<VectorRecord>,
}

/// Cosine similarity; zero when either vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    /// Dimensionality, fixed by the first record.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.records.first().map(|r| r.vector.len())
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    fn check_dimensions(&self, actual: usize) -> Result<(), Report<KnowledgeError>> {
        match self.dimensions() {
            Some(expected) if expected != actual => {
                Err(KnowledgeError::DimensionMismatch { expected, actual }.into())
            }
            _ => Ok(()),
        }
    }

    /// Adds a record.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::DimensionMismatch` if the vector length
    /// differs from the existing records.
    pub fn add(&mut self, record: VectorRecord) -> Result<(), Report<KnowledgeError>> {
        self.check_dimensions(record.vector.len())?;
        self.records.push(record);
        Ok(())
    }

    /// Returns the `k` most similar records, highest score first.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::DimensionMismatch` if the query vector length
    /// differs from the stored vectors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredRecord>, Report<KnowledgeError>> {
        self.check_dimensions(query.len())?;
        let mut scored: Vec<ScoredRecord> = self
            .records
            .iter()
            .map(|record| ScoredRecord {
                score: cosine_similarity(query, &record.vector),
                record: record.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    /// Reads a collection from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Io` or `KnowledgeError::Corrupt`.
    pub async fn load(path: &Path) -> Result<Self, Report<KnowledgeError>> {
        let display = path.display().to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| KnowledgeError::Io {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        let collection: Self =
            serde_json::from_slice(&bytes).map_err(|e| KnowledgeError::Corrupt {
                path: display.clone(),
                reason: e.to_string(),
            })?;
        if let Some(expected) = collection.dimensions()
            && let Some(bad) = collection.records.iter().find(|r| r.vector.len() != expected)
        {
            return Err(KnowledgeError::Corrupt {
                path: display,
                reason: format!(
                    "record {} has {} dimensions, expected {expected}",
                    bad.id,
                    bad.vector.len()
                ),
            }
            .into());
        }
        Ok(collection)
    }

    /// Writes the collection as JSON, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Io` if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), Report<KnowledgeError>> {
        let display = path.display().to_string();
        let io_error = |e: std::io::Error| KnowledgeError::Io {
            path: display.clone(),
            reason: e.to_string(),
        };
        let bytes = serde_json::to_vec(self).map_err(|e| KnowledgeError::Io {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_error)?;
        Ok(())
    }
}
