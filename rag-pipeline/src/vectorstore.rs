//! Vector store trait for storing documents and answering nearest-neighbour queries.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{CollectionInfo, Document, Embedding, RetrievedItem};
use crate::error::{RagError, Result};

/// A storage backend scoped to one named collection.
///
/// The store owns the embedding function for its collection: [`upsert`]
/// and [`query`] embed text before touching the index. Callers that already
/// hold embeddings (the orchestrator embeds each ingest batch once) use
/// [`upsert_embedded`] instead.
///
/// [`upsert`]: VectorStore::upsert
/// [`query`]: VectorStore::query
/// [`upsert_embedded`]: VectorStore::upsert_embedded
///
/// # Example
///
/// ```rust,ignore
/// use rag_pipeline::{Document, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::open(&settings.store, embedder).await?;
/// store.upsert(&[Document::new("Rust is a systems language.")]).await?;
/// let hits = store.query("what is rust?", 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and insert or replace documents.
    ///
    /// Either every document becomes visible to subsequent queries or none do.
    async fn upsert(&self, documents: &[Document]) -> Result<()>;

    /// Insert or replace documents whose embeddings were computed by the caller.
    ///
    /// `embeddings[i]` belongs to `documents[i]`.
    async fn upsert_embedded(&self, documents: &[Document], embeddings: Vec<Embedding>)
    -> Result<()>;

    /// Return up to `limit` documents nearest to `text`, ordered by ascending distance.
    ///
    /// Empty `text` returns an empty result without embedding anything.
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<RetrievedItem>>;

    /// Delete documents by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[&str]) -> Result<()>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize>;

    /// Collection name and size.
    async fn info(&self) -> Result<CollectionInfo>;

    /// Drop the collection and create it again, empty.
    async fn recreate(&self) -> Result<()>;
}

/// How distance between two embeddings is measured. Smaller is always more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine similarity`.
    Cosine,
    /// `1 - dot product`.
    Ip,
}

impl DistanceMetric {
    /// Compute the distance between `a` and `b`.
    ///
    /// Cosine distance against a zero-magnitude vector is 1.0.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (norm_a * norm_b)
            }
            DistanceMetric::Ip => 1.0 - a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Ip => "ip",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            "ip" => Ok(DistanceMetric::Ip),
            other => Err(RagError::Config(format!(
                "unknown distance metric '{other}' (expected l2, cosine or ip)"
            ))),
        }
    }
}
