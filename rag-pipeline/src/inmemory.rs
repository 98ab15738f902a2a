//! In-memory vector store with optional JSON snapshot persistence.
//!
//! [`InMemoryVectorStore`] keeps one named collection in a `HashMap` behind a
//! `tokio::sync::RwLock` and scans it exhaustively on every query. When a
//! persist directory is configured the collection is loaded from
//! `<dir>/<collection>.json` on open and rewritten after every mutation.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::document::{CollectionInfo, Document, Embedding, RetrievedItem};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

const BACKEND: &str = "memory";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    document: Document,
    embedding: Embedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    name: String,
    metric: DistanceMetric,
    dimensions: Option<usize>,
    entries: HashMap<String, Entry>,
}

impl Collection {
    fn empty(name: &str, metric: DistanceMetric) -> Self {
        Self { name: name.to_string(), metric, dimensions: None, entries: HashMap::new() }
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != actual => {
                error!(collection = %self.name, expected, actual, "embedding dimension mismatch");
                Err(RagError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// A [`VectorStore`] holding a single collection in memory.
///
/// Writes are all-or-nothing: a batch is validated, applied to a copy of the
/// collection, persisted (when configured), and only then made visible.
///
/// # Example
///
/// ```rust,ignore
/// use rag_pipeline::{InMemoryVectorStore, StoreConfig};
///
/// let store = InMemoryVectorStore::open(&StoreConfig::default(), embedder).await?;
/// ```
pub struct InMemoryVectorStore {
    name: String,
    metric: DistanceMetric,
    persist_directory: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: RwLock<Collection>,
}

impl InMemoryVectorStore {
    /// Create an empty, memory-only collection using the default metric.
    pub fn new(name: impl Into<String>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let name = name.into();
        let metric = DistanceMetric::default();
        Self {
            collection: RwLock::new(Collection::empty(&name, metric)),
            name,
            metric,
            persist_directory: None,
            embedder,
        }
    }

    /// Open the configured collection, loading its snapshot if one exists and
    /// creating it empty otherwise.
    ///
    /// An existing snapshot keeps the metric it was created with.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Store`] if the snapshot exists but cannot be read
    /// or decoded.
    pub async fn open(config: &StoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let name = config.collection_name.clone();
        let mut collection = Collection::empty(&name, config.distance);

        if let Some(dir) = &config.persist_directory {
            let path = snapshot_path(dir, &name);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    collection = serde_json::from_slice(&bytes).map_err(|e| {
                        error!(path = %path.display(), error = %e, "corrupt collection snapshot");
                        RagError::store(BACKEND, format!("failed to decode {}: {e}", path.display()))
                    })?;
                    if collection.metric != config.distance {
                        warn!(
                            collection = %name,
                            stored = %collection.metric,
                            configured = %config.distance,
                            "keeping the metric the collection was created with"
                        );
                    }
                    info!(collection = %name, count = collection.entries.len(), "using existing collection");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    info!(collection = %name, "created new collection");
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to read collection snapshot");
                    return Err(RagError::store(
                        BACKEND,
                        format!("failed to read {}: {e}", path.display()),
                    ));
                }
            }
        } else {
            info!(collection = %name, "created new in-memory collection");
        }

        Ok(Self {
            name,
            metric: collection.metric,
            persist_directory: config.persist_directory.clone(),
            embedder,
            collection: RwLock::new(collection),
        })
    }

    /// Use a different distance metric. Only meaningful before anything is stored.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self.collection.get_mut().metric = metric;
        self
    }

    /// The metric queries are scored with.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn persist(&self, collection: &Collection) -> Result<()> {
        let Some(dir) = &self.persist_directory else {
            return Ok(());
        };
        let path = snapshot_path(dir, &self.name);
        let tmp = path.with_extension("json.tmp");
        let map_io = |e: std::io::Error| {
            error!(path = %path.display(), error = %e, "failed to persist collection");
            RagError::store(BACKEND, format!("failed to write {}: {e}", path.display()))
        };

        let bytes = serde_json::to_vec(collection)
            .map_err(|e| RagError::store(BACKEND, format!("failed to encode collection: {e}")))?;
        tokio::fs::create_dir_all(dir).await.map_err(map_io)?;
        tokio::fs::write(&tmp, bytes).await.map_err(map_io)?;
        tokio::fs::rename(&tmp, &path).await.map_err(map_io)?;
        debug!(path = %path.display(), count = collection.entries.len(), "collection persisted");
        Ok(())
    }
}

fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        self.upsert_embedded(documents, embeddings).await
    }

    async fn upsert_embedded(
        &self,
        documents: &[Document],
        embeddings: Vec<Embedding>,
    ) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        if documents.len() != embeddings.len() {
            return Err(RagError::store(
                BACKEND,
                format!("{} documents but {} embeddings", documents.len(), embeddings.len()),
            ));
        }

        let mut seen = HashSet::with_capacity(documents.len());
        for document in documents {
            if document.id.is_empty() {
                return Err(RagError::store(BACKEND, "document id must not be empty"));
            }
            if !seen.insert(document.id.as_str()) {
                return Err(RagError::store(
                    BACKEND,
                    format!("duplicate id '{}' in batch", document.id),
                ));
            }
        }

        let mut guard = self.collection.write().await;
        let batch_dimensions = embeddings[0].len();
        if batch_dimensions == 0 {
            return Err(RagError::store(BACKEND, "embeddings must not be empty"));
        }
        guard.check_dimensions(batch_dimensions)?;
        if let Some(bad) = embeddings.iter().find(|e| e.len() != batch_dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: batch_dimensions,
                actual: bad.len(),
            });
        }

        let mut next = guard.clone();
        next.dimensions = Some(batch_dimensions);
        for (document, embedding) in documents.iter().zip(embeddings) {
            next.entries.insert(document.id.clone(), Entry { document: document.clone(), embedding });
        }
        self.persist(&next).await?;
        *guard = next;

        info!(collection = %self.name, added = documents.len(), "upserted documents");
        Ok(())
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<RetrievedItem>> {
        if text.is_empty() {
            warn!("empty query text");
            return Ok(Vec::new());
        }
        if limit == 0 || self.collection.read().await.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(text).await?;

        let collection = self.collection.read().await;
        collection.check_dimensions(query_embedding.len())?;

        let mut hits: Vec<RetrievedItem> = collection
            .entries
            .values()
            .map(|entry| RetrievedItem {
                id: entry.document.id.clone(),
                document_text: entry.document.text.clone(),
                metadata: entry.document.metadata.clone(),
                distance: collection.metric.distance(&entry.embedding, &query_embedding),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);

        debug!(collection = %self.name, results = hits.len(), "query complete");
        Ok(hits)
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            warn!("delete called with no ids");
            return Ok(());
        }

        let mut guard = self.collection.write().await;
        let mut next = guard.clone();
        let removed = ids.iter().filter(|id| next.entries.remove(**id).is_some()).count();
        if removed == 0 {
            debug!(collection = %self.name, "no matching ids to delete");
            return Ok(());
        }
        self.persist(&next).await?;
        *guard = next;

        info!(collection = %self.name, removed, "deleted documents");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.collection.read().await.entries.len())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            name: self.name.clone(),
            count: self.count().await?,
            persist_directory: self.persist_directory.as_ref().map(|p| p.display().to_string()),
        })
    }

    async fn recreate(&self) -> Result<()> {
        let mut guard = self.collection.write().await;
        if let Some(dir) = &self.persist_directory {
            let path = snapshot_path(dir, &self.name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to delete collection snapshot");
                    return Err(RagError::store(
                        BACKEND,
                        format!("failed to delete {}: {e}", path.display()),
                    ));
                }
            }
        }
        *guard = Collection::empty(&self.name, self.metric);
        info!(collection = %self.name, "collection recreated");
        Ok(())
    }
}
