//! Reranker trait for re-scoring retrieved passages.

use async_trait::async_trait;

use crate::document::RankedItem;
use crate::error::Result;

/// A reranker that scores passages against a query and returns the most relevant.
///
/// Implementations return at most `min(top_n, candidates.len())` items ordered
/// by descending relevance. An empty query, empty candidate list, or zero
/// `top_n` yields an empty result (logged as a warning), never an error.
/// Remote failures are returned as [`RagError::Provider`](crate::RagError::Provider)
/// with [`Stage::Rerank`](crate::Stage::Rerank); whether to degrade is the
/// caller's decision.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Rerank `candidates` against `query`, keeping the best `top_n`.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedItem>>;

    /// The model name reported in system diagnostics.
    fn model_name(&self) -> &str;
}
