//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::document::Embedding;
use crate::error::{RagError, Result, Stage};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. One embedding is returned per input text, in input order. An
/// empty input returns an empty output without contacting the backend.
/// Failures are reported as [`RagError::Provider`] with [`Stage::Embedding`];
/// no implementation in this crate retries on its own.
///
/// # Example
///
/// ```rust,ignore
/// use rag_pipeline::EmbeddingProvider;
///
/// let embeddings = provider.embed(&["hello", "world"]).await?;
/// assert_eq!(embeddings.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Generate the embedding for a single text.
    ///
    /// The default implementation delegates to [`embed`](EmbeddingProvider::embed)
    /// with a one-element batch.
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::provider(Stage::Embedding, "provider returned no embedding for input")
        })
    }

    /// The model name reported in system diagnostics.
    fn model_name(&self) -> &str;
}
