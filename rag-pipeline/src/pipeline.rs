//! RAG orchestrator.
//!
//! The [`RagOrchestrator`] coordinates the two workflows of the system by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], a [`RerankProvider`]
//! and a [`GenerationProvider`]:
//!
//! - **ingest**: documents → one batched embedding call → store upsert
//! - **answer**: question → retrieve → optional rerank → grounded generation
//!
//! Neither workflow returns an error. Ingestion reports a `bool` and answering
//! always produces an [`AnswerResult`] whose `answer` explains any failure, so
//! a long-running session survives a failing dependency. Only construction can
//! fail, and it fails fast on missing configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use rag_pipeline::{AnswerOptions, RagOrchestrator, RagSettings};
//!
//! let orchestrator = RagOrchestrator::from_settings(RagSettings::from_env()?).await?;
//!
//! orchestrator.ingest(&["AI is a branch of computer science."], None, None).await;
//! let result = orchestrator.answer("What is AI?", AnswerOptions::default()).await;
//! println!("{}", result.answer);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{AnswerOptions, RagSettings};
use crate::document::{
    AnswerResult, CollectionInfo, Document, Metadata, RankedItem, RetrievedItem, default_metadata,
    generate_id,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerateOptions, GenerationProvider};
use crate::inmemory::InMemoryVectorStore;
use crate::openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
use crate::rerank_http::HttpRerankProvider;
use crate::reranker::RerankProvider;
use crate::vectorstore::VectorStore;

/// Answer returned for an empty question.
pub const EMPTY_QUESTION_ANSWER: &str = "question cannot be empty";

/// Answer returned when retrieval finds nothing; generation is not attempted.
pub const NO_CONTEXT_ANSWER: &str = "no relevant context found to answer the question";

/// Prefix of the answer returned when retrieval or generation fails.
pub const ERROR_ANSWER_PREFIX: &str = "error while processing question: ";

/// Read-only diagnostics about the orchestrator and its collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SystemInfo {
    /// The collection could be inspected.
    Available {
        /// Embedding model name.
        embedding_model: String,
        /// Rerank model name.
        reranker_model: String,
        /// Generation model name.
        llm_model: String,
        /// Collection name and size.
        collection_info: CollectionInfo,
        /// Redacted settings, when the orchestrator was built from settings.
        #[serde(skip_serializing_if = "Option::is_none")]
        config: Option<Value>,
    },
    /// Inspecting the collection failed.
    Unavailable {
        /// The failure message.
        error: String,
    },
}

/// The RAG orchestrator.
///
/// Provider handles are created once and shared by every call. Mutating
/// operations ([`ingest`](Self::ingest), [`delete`](Self::delete),
/// [`clear_database`](Self::clear_database)) hold an exclusive gate, reads
/// ([`answer`](Self::answer), [`system_info`](Self::system_info)) a shared
/// one, so a clear never interleaves with an ingest through the same
/// orchestrator.
pub struct RagOrchestrator {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    reranker: Arc<dyn RerankProvider>,
    generator: Arc<dyn GenerationProvider>,
    generate_options: GenerateOptions,
    answer_defaults: AnswerOptions,
    settings: Option<RagSettings>,
    gate: RwLock<()>,
}

impl RagOrchestrator {
    /// Create a new [`RagOrchestratorBuilder`].
    pub fn builder() -> RagOrchestratorBuilder {
        RagOrchestratorBuilder::default()
    }

    /// Build the full remote stack from settings: OpenAI-compatible embedding
    /// and chat providers, the HTTP reranker, and the configured collection.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any API key is missing or a provider
    /// cannot be constructed, and [`RagError::Store`] if an existing
    /// collection snapshot cannot be loaded.
    pub async fn from_settings(settings: RagSettings) -> Result<Self> {
        info!("initializing RAG orchestrator");
        settings.validate()?;

        let embedding_provider: Arc<dyn EmbeddingProvider> =
            Arc::new(OpenAIEmbeddingProvider::new(settings.embedding.clone())?);
        let vector_store =
            Arc::new(InMemoryVectorStore::open(&settings.store, embedding_provider.clone()).await?);
        let reranker = Arc::new(HttpRerankProvider::new(settings.reranker.clone())?);
        let generator = Arc::new(OpenAIChatProvider::new(settings.llm.clone())?);

        let orchestrator = Self::builder()
            .embedding_provider(embedding_provider)
            .vector_store(vector_store)
            .reranker(reranker)
            .generator(generator)
            .settings(settings)
            .build()?;
        info!(orchestrator = ?orchestrator, "RAG orchestrator ready");
        Ok(orchestrator)
    }

    /// The answer options used by [`ask`](Self::ask).
    pub fn answer_defaults(&self) -> AnswerOptions {
        self.answer_defaults
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest raw texts, generating ids and default metadata where absent.
    ///
    /// When given, `metadatas` and `ids` must match `documents` in length.
    /// Returns `true` only if embedding and storage both succeeded; details of
    /// any failure are logged.
    pub async fn ingest<T>(
        &self,
        documents: &[T],
        metadatas: Option<Vec<Metadata>>,
        ids: Option<Vec<String>>,
    ) -> bool
    where
        T: AsRef<str> + Sync,
    {
        if documents.is_empty() {
            warn!("ingest rejected: document list is empty");
            return false;
        }
        if let Some(metadatas) = &metadatas {
            if metadatas.len() != documents.len() {
                warn!(
                    documents = documents.len(),
                    metadatas = metadatas.len(),
                    "ingest rejected: metadata count does not match documents"
                );
                return false;
            }
        }
        if let Some(ids) = &ids {
            if ids.len() != documents.len() {
                warn!(
                    documents = documents.len(),
                    ids = ids.len(),
                    "ingest rejected: id count does not match documents"
                );
                return false;
            }
        }

        let mut metadatas = metadatas.map(Vec::into_iter);
        let mut ids = ids.map(Vec::into_iter);
        let batch: Vec<Document> = documents
            .iter()
            .map(|text| Document {
                id: ids.as_mut().and_then(|it| it.next()).unwrap_or_else(generate_id),
                text: text.as_ref().to_string(),
                metadata: metadatas
                    .as_mut()
                    .and_then(|it| it.next())
                    .unwrap_or_else(default_metadata),
            })
            .collect();

        self.ingest_documents(batch).await
    }

    /// Ingest fully formed documents: one embedding call for the whole batch,
    /// then a single upsert.
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> bool {
        if documents.is_empty() {
            warn!("ingest rejected: document list is empty");
            return false;
        }
        let _gate = self.gate.write().await;

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = match stage("embedding", self.embedding_provider.embed(&texts)).await {
            Ok(embeddings) if embeddings.is_empty() => {
                error!(documents = documents.len(), "embedding provider returned no embeddings");
                return false;
            }
            Ok(embeddings) => embeddings,
            Err(e) => {
                error!(error = %e, "ingest failed during embedding");
                return false;
            }
        };

        if let Err(e) =
            stage("store.upsert", self.vector_store.upsert_embedded(&documents, embeddings)).await
        {
            error!(error = %e, "ingest failed during upsert");
            return false;
        }

        info!(count = documents.len(), "ingested documents");
        true
    }

    /// Answer a question with the orchestrator's default [`AnswerOptions`].
    pub async fn ask(&self, question: &str) -> AnswerResult {
        self.answer(question, self.answer_defaults).await
    }

    /// Answer a question: retrieve, optionally rerank, then generate from the
    /// assembled context.
    ///
    /// Never fails. An empty question or empty retrieval short-circuits before
    /// generation. A rerank failure or empty rerank degrades to the first
    /// `top_n` retrieved passages. A retrieval or generation failure becomes
    /// an answer starting with [`ERROR_ANSWER_PREFIX`].
    pub async fn answer(&self, question: &str, options: AnswerOptions) -> AnswerResult {
        if question.is_empty() {
            warn!("answer skipped: question is empty");
            return AnswerResult::terminal(question, EMPTY_QUESTION_ANSWER);
        }
        let _gate = self.gate.read().await;
        info!(question = %preview(question), ?options, "answering question");

        let retrieved = match stage(
            "store.query",
            self.vector_store.query(question, options.retrieve_limit),
        )
        .await
        {
            Ok(retrieved) => retrieved,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return AnswerResult::terminal(question, format!("{ERROR_ANSWER_PREFIX}{e}"));
            }
        };

        if retrieved.is_empty() {
            warn!("no relevant documents retrieved");
            return AnswerResult::terminal(question, NO_CONTEXT_ANSWER);
        }
        info!(retrieved = retrieved.len(), "retrieved documents");

        let (context, reranked) = if options.use_rerank {
            self.rerank_context(question, &retrieved, options.top_n).await
        } else {
            debug!(top_n = options.top_n, "rerank disabled, using retrieval order");
            (baseline_context(&retrieved, options.top_n), Vec::new())
        };

        let answer = match stage(
            "generation",
            self.generator.generate_with_context(&context, question, &self.generate_options),
        )
        .await
        {
            Ok(answer) => {
                info!("question answered");
                answer
            }
            Err(e) => {
                error!(error = %e, "generation failed");
                format!("{ERROR_ANSWER_PREFIX}{e}")
            }
        };

        AnswerResult { question: question.to_string(), context, answer, retrieved, reranked }
    }

    async fn rerank_context(
        &self,
        question: &str,
        retrieved: &[RetrievedItem],
        top_n: usize,
    ) -> (String, Vec<RankedItem>) {
        let candidates: Vec<String> = retrieved.iter().map(|r| r.document_text.clone()).collect();
        match stage("rerank", self.reranker.rerank(question, &candidates, top_n)).await {
            Ok(reranked) if !reranked.is_empty() => {
                info!(selected = reranked.len(), "using reranked documents as context");
                let context = join_texts(reranked.iter().map(|r| r.document_text.as_str()));
                (context, reranked)
            }
            Ok(_) => {
                warn!("rerank returned nothing, falling back to retrieval order");
                (baseline_context(retrieved, top_n), Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "rerank failed, falling back to retrieval order");
                (baseline_context(retrieved, top_n), Vec::new())
            }
        }
    }

    /// Delete stored documents by id. Returns `false` for an empty id list or
    /// a store failure.
    pub async fn delete(&self, ids: &[&str]) -> bool {
        if ids.is_empty() {
            warn!("delete rejected: id list is empty");
            return false;
        }
        let _gate = self.gate.write().await;
        match stage("store.delete", self.vector_store.delete(ids)).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "delete failed");
                false
            }
        }
    }

    /// Collect model names and collection statistics.
    ///
    /// A store failure yields [`SystemInfo::Unavailable`] instead of an error.
    pub async fn system_info(&self) -> SystemInfo {
        let _gate = self.gate.read().await;
        match self.vector_store.info().await {
            Ok(collection_info) => SystemInfo::Available {
                embedding_model: self.embedding_provider.model_name().to_string(),
                reranker_model: self.reranker.model_name().to_string(),
                llm_model: self.generator.model_name().to_string(),
                collection_info,
                config: self.settings.as_ref().map(RagSettings::redacted),
            },
            Err(e) => {
                error!(error = %e, "failed to collect system info");
                SystemInfo::Unavailable { error: e.to_string() }
            }
        }
    }

    /// Drop and recreate the collection if it holds any documents.
    ///
    /// Returns `true` when the collection is empty afterwards.
    pub async fn clear_database(&self) -> bool {
        let _gate = self.gate.write().await;
        let count = match self.vector_store.count().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "failed to count documents before clearing");
                return false;
            }
        };
        if count == 0 {
            info!("database is already empty");
            return true;
        }
        match stage("store.recreate", self.vector_store.recreate()).await {
            Ok(()) => {
                info!(removed = count, "database cleared");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to clear database");
                false
            }
        }
    }
}

impl fmt::Debug for RagOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagOrchestrator")
            .field("embedding_model", &self.embedding_provider.model_name())
            .field("reranker_model", &self.reranker.model_name())
            .field("llm_model", &self.generator.model_name())
            .finish_non_exhaustive()
    }
}

/// Log before a provider call and its outcome after.
async fn stage<T, F>(name: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    debug!(stage = name, "calling");
    let started = Instant::now();
    let outcome = call.await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &outcome {
        Ok(_) => debug!(stage = name, elapsed_ms, "succeeded"),
        Err(e) => warn!(stage = name, elapsed_ms, error = %e, "failed"),
    }
    outcome
}

fn baseline_context(retrieved: &[RetrievedItem], top_n: usize) -> String {
    join_texts(retrieved.iter().take(top_n).map(|r| r.document_text.as_str()))
}

fn join_texts<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts.collect::<Vec<_>>().join("\n")
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 50;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(MAX_CHARS).collect::<String>())
    }
}

/// Builder for constructing a [`RagOrchestrator`].
///
/// All four providers are required. Settings are optional; when present they
/// supply the answer defaults and appear, redacted, in [`SystemInfo`].
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = RagOrchestrator::builder()
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .reranker(Arc::new(reranker))
///     .generator(Arc::new(llm))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagOrchestratorBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn RerankProvider>>,
    generator: Option<Arc<dyn GenerationProvider>>,
    generate_options: Option<GenerateOptions>,
    answer_defaults: Option<AnswerOptions>,
    settings: Option<RagSettings>,
}

impl RagOrchestratorBuilder {
    /// Set the embedding provider used for ingestion.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the rerank provider.
    pub fn reranker(mut self, reranker: Arc<dyn RerankProvider>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Set the generation provider.
    pub fn generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the sampling options used for every answer.
    pub fn generate_options(mut self, options: GenerateOptions) -> Self {
        self.generate_options = Some(options);
        self
    }

    /// Set the answer options used by [`RagOrchestrator::ask`].
    pub fn answer_defaults(mut self, options: AnswerOptions) -> Self {
        self.answer_defaults = Some(options);
        self
    }

    /// Attach the settings the providers were built from.
    pub fn settings(mut self, settings: RagSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the [`RagOrchestrator`], validating that all providers are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any provider is missing.
    pub fn build(self) -> Result<RagOrchestrator> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let reranker =
            self.reranker.ok_or_else(|| RagError::Config("reranker is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        let answer_defaults = self
            .answer_defaults
            .or_else(|| self.settings.as_ref().map(|s| s.answer))
            .unwrap_or_default();

        Ok(RagOrchestrator {
            embedding_provider,
            vector_store,
            reranker,
            generator,
            generate_options: self.generate_options.unwrap_or_default(),
            answer_defaults,
            settings: self.settings,
            gate: RwLock::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_context_takes_head_of_retrieval() {
        let item = |text: &str, distance| RetrievedItem {
            id: text.to_string(),
            document_text: text.to_string(),
            metadata: Metadata::new(),
            distance,
        };
        let retrieved = [item("a", 0.1), item("b", 0.2), item("c", 0.3)];
        assert_eq!(baseline_context(&retrieved, 2), "a\nb");
        assert_eq!(baseline_context(&retrieved, 10), "a\nb\nc");
        assert_eq!(baseline_context(&retrieved, 0), "");
    }

    #[test]
    fn preview_truncates_long_questions_on_char_boundaries() {
        let long = "问".repeat(60);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 53);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn stage_passes_outcomes_through() {
        assert_eq!(stage("ok", async { Ok::<_, RagError>(7) }).await.unwrap(), 7);

        let err = stage("failing", async {
            Err::<(), _>(RagError::provider(crate::error::Stage::Rerank, "down"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.stage(), Some(crate::error::Stage::Rerank));
    }

    #[test]
    fn builder_requires_every_provider() {
        let err = RagOrchestrator::builder().build().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: embedding_provider is required");
    }
}
