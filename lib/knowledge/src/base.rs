//! Named collections with ingestion and retrieval.

use crate::collection::{ScoredRecord, VectorCollection, VectorRecord};
use crate::error::KnowledgeError;
use crate::splitter::TextSplitter;
use rootcause::prelude::{Report, ResultExt};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use switchboard_ai::EmbeddingBackend;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Returns true if `name` is usable as a collection (and file) name.
#[must_use]
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_name(name: &str) -> Result<(), Report<KnowledgeError>> {
    if is_valid_collection_name(name) {
        Ok(())
    } else {
        Err(KnowledgeError::InvalidCollectionName {
            name: name.to_string(),
        }
        .into())
    }
}

/// A set of named vector collections, optionally persisted to a directory.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    dir: Option<PathBuf>,
    splitter: TextSplitter,
    collections: RwLock<HashMap<String, VectorCollection>>,
}

impl KnowledgeBase {
    /// Creates a knowledge base that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a directory of `<collection>.json` files, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Io` if the directory cannot be read, or the
    /// error of the first collection file that fails to load.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, Report<KnowledgeError>> {
        let dir = dir.into();
        let io_error = |e: std::io::Error| KnowledgeError::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;

        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            let Some(stem) = collection_stem(&path) else {
                continue;
            };
            let mut collection = VectorCollection::load(&path).await?;
            collection.name = stem.clone();
            info!(collection = %stem, records = collection.len(), "loaded collection");
            collections.insert(stem, collection);
        }

        Ok(Self {
            dir: Some(dir),
            splitter: TextSplitter::default(),
            collections: RwLock::new(collections),
        })
    }

    /// Replaces the splitter used for ingestion.
    #[must_use]
    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Names of all collections, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of records in a collection (zero if absent).
    pub async fn collection_len(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map_or(0, VectorCollection::len)
    }

    /// Splits, embeds and stores `text` in `collection`, creating it if
    /// needed. Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCollectionName`, `EmptyDocument`, `EmbeddingFailed`,
    /// `EmbeddingCountMismatch`, `DimensionMismatch`, or `Io` when persisting
    /// fails. Nothing is stored on error.
    #[instrument(skip(self, text, metadata, embedder), fields(chars = text.len()))]
    pub async fn ingest(
        &self,
        collection: &str,
        text: &str,
        metadata: Map<String, JsonValue>,
        embedder: &dyn EmbeddingBackend,
    ) -> Result<usize, Report<KnowledgeError>> {
        validate_name(collection)?;
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Err(KnowledgeError::EmptyDocument.into());
        }

        let vectors = embed_all(embedder, collection, &chunks).await?;

        let mut collections = self.collections.write().await;
        let mut updated = collections
            .get(collection)
            .cloned()
            .unwrap_or_else(|| VectorCollection::new(collection));
        for (chunk, vector) in chunks.iter().zip(vectors) {
            updated.add(VectorRecord::new(chunk.clone(), vector).with_metadata(metadata.clone()))?;
        }

        if let Some(dir) = &self.dir {
            updated.save(&collection_path(dir, collection)).await?;
        }
        let count = chunks.len();
        info!(collection, chunks = count, total = updated.len(), "ingested document");
        collections.insert(collection.to_string(), updated);
        Ok(count)
    }

    /// Returns the `k` records most similar to `query`.
    ///
    /// An unknown collection yields no hits.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingFailed` or `DimensionMismatch`.
    #[instrument(skip(self, query, embedder))]
    pub async fn retrieve(
        &self,
        collection: &str,
        query: &str,
        embedder: &dyn EmbeddingBackend,
        k: usize,
    ) -> Result<Vec<ScoredRecord>, Report<KnowledgeError>> {
        if self.collection_len(collection).await == 0 {
            warn!(collection, "retrieval from empty or unknown collection");
            return Ok(Vec::new());
        }

        let query_vector = embed_all(embedder, collection, &[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let collections = self.collections.read().await;
        match collections.get(collection) {
            Some(c) => c.search(&query_vector, k),
            None => Ok(Vec::new()),
        }
    }

    /// Retrieves and joins the hit texts into one context block.
    ///
    /// # Errors
    ///
    /// Same as [`KnowledgeBase::retrieve`].
    pub async fn retrieve_context(
        &self,
        collection: &str,
        query: &str,
        embedder: &dyn EmbeddingBackend,
        k: usize,
    ) -> Result<String, Report<KnowledgeError>> {
        let hits = self.retrieve(collection, query, embedder, k).await?;
        Ok(join_context(&hits))
    }
}

/// Joins hit contents with blank lines, best hit first.
#[must_use]
pub fn join_context(hits: &[ScoredRecord]) -> String {
    hits.iter()
        .map(|h| h.record.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collection_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

fn collection_stem(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    is_valid_collection_name(stem).then(|| stem.to_string())
}

/// Embeds `inputs`, requiring exactly one vector per input.
async fn embed_all(
    embedder: &dyn EmbeddingBackend,
    collection: &str,
    inputs: &[String],
) -> Result<Vec<Vec<f32>>, Report<KnowledgeError>> {
    let vectors = embedder
        .embed(inputs)
        .await
        .context(KnowledgeError::EmbeddingFailed {
            collection: collection.to_string(),
        })?;
    if vectors.len() != inputs.len() {
        return Err(KnowledgeError::EmbeddingCountMismatch {
            collection: collection.to_string(),
            expected: inputs.len(),
            actual: vectors.len(),
        }
        .into());
    }
    Ok(vectors)
}
