//! HTTP rerank provider for `POST {base_url}/rerank` endpoints.
//!
//! The request carries `{model, query, passages}` and the response is
//! `{results: [{index, relevance_score}]}`, where `index` points back into
//! the submitted passages.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ProviderConfig;
use crate::document::RankedItem;
use crate::error::{RagError, Result, Stage};
use crate::openai::{http_client, post_json, read_json};
use crate::reranker::RerankProvider;

/// A [`RerankProvider`] that calls a remote cross-encoder over HTTP.
///
/// # Example
///
/// ```rust,ignore
/// use rag_pipeline::{HttpRerankProvider, ProviderConfig, RerankProvider};
///
/// let reranker = HttpRerankProvider::new(ProviderConfig::new(
///     "key",
///     "https://api.example.com/v1",
///     "bge-reranker-v2-m3",
/// ))?;
/// let ranked = reranker.rerank("what is rust?", &passages, 3).await?;
/// ```
pub struct HttpRerankProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpRerankProvider {
    /// Create a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the api key, base url, or model name is
    /// empty, or the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config, Stage::Rerank)?;
        debug!(provider = "http", model = %config.model_name, "rerank provider ready");
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    passages: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[async_trait]
impl RerankProvider for HttpRerankProvider {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedItem>> {
        if query.is_empty() {
            warn!("rerank skipped: empty query");
            return Ok(Vec::new());
        }
        if candidates.is_empty() {
            warn!("rerank skipped: no candidates");
            return Ok(Vec::new());
        }
        if top_n == 0 {
            warn!("rerank skipped: top_n must be greater than zero");
            return Ok(Vec::new());
        }

        debug!(candidates = candidates.len(), top_n, model = %self.config.model_name, "reranking");

        let request_body =
            RerankRequest { model: &self.config.model_name, query, passages: candidates };
        let url = self.config.endpoint("rerank");
        let response =
            post_json(&self.client, &self.config, &url, &request_body, Stage::Rerank).await?;
        let parsed: RerankResponse = read_json(response, Stage::Rerank).await?;

        let mut results = parsed.results;
        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        // A passage is kept once, at its best score.
        let keep = top_n.min(candidates.len());
        let mut seen = HashSet::with_capacity(keep);
        let mut ranked = Vec::with_capacity(keep);
        for r in results {
            if ranked.len() == keep {
                break;
            }
            let text = candidates.get(r.index).ok_or_else(|| {
                error!(index = r.index, candidates = candidates.len(), "rerank index out of range");
                RagError::provider(
                    Stage::Rerank,
                    format!(
                        "result index {} out of range for {} passages",
                        r.index,
                        candidates.len()
                    ),
                )
            })?;
            if !seen.insert(r.index) {
                debug!(index = r.index, "dropping repeated rerank index");
                continue;
            }
            ranked.push(RankedItem { document_text: text.clone(), relevance_score: r.relevance_score });
        }

        info!(count = ranked.len(), "rerank complete");
        Ok(ranked)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
