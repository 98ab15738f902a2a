//! Fake providers shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rag_pipeline::{
    CollectionInfo, Document, Embedding, EmbeddingProvider, GenerateOptions, GenerationProvider,
    RagError, RagOrchestrator, RankedItem, RerankProvider, Result, RetrievedItem, Stage,
    VectorStore,
};

pub const DIM: usize = 32;

/// Bag-of-words embedder: each lowercase token is hashed into one of `DIM`
/// buckets. Deterministic, so texts sharing words land close together.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub return_empty: AtomicBool,
}

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Embedding {
        let mut v = vec![0.0f32; DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            let hash = token.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        v
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RagError::provider(Stage::Embedding, "connection refused"));
        }
        if self.return_empty.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword-embedder"
    }
}

/// A store with canned query results that counts every call.
#[derive(Default)]
pub struct ScriptedStore {
    pub results: Mutex<Vec<RetrievedItem>>,
    pub stored: Mutex<Vec<Document>>,
    pub query_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub recreate_calls: AtomicUsize,
    pub fail_query: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_info: AtomicBool,
}

impl ScriptedStore {
    pub fn with_results(results: Vec<RetrievedItem>) -> Self {
        let store = Self::default();
        *store.results.lock().unwrap() = results;
        store
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn upsert(&self, documents: &[Document]) -> Result<()> {
        let embeddings = documents.iter().map(|d| KeywordEmbedder::vector(&d.text)).collect();
        self.upsert_embedded(documents, embeddings).await
    }

    async fn upsert_embedded(
        &self,
        documents: &[Document],
        _embeddings: Vec<Embedding>,
    ) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(RagError::store("scripted", "write failed"));
        }
        self.stored.lock().unwrap().extend_from_slice(documents);
        Ok(())
    }

    async fn query(&self, _text: &str, limit: usize) -> Result<Vec<RetrievedItem>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(RagError::store("scripted", "index unavailable"));
        }
        Ok(self.results.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn delete(&self, ids: &[&str]) -> Result<()> {
        self.stored.lock().unwrap().retain(|d| !ids.contains(&d.id.as_str()));
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.stored.lock().unwrap().len())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        if self.fail_info.load(Ordering::SeqCst) {
            return Err(RagError::store("scripted", "collection missing"));
        }
        Ok(CollectionInfo {
            name: "scripted".to_string(),
            count: self.count().await?,
            persist_directory: None,
        })
    }

    async fn recreate(&self) -> Result<()> {
        self.recreate_calls.fetch_add(1, Ordering::SeqCst);
        self.stored.lock().unwrap().clear();
        Ok(())
    }
}

/// What a [`ScriptedReranker`] does when called.
#[derive(Clone)]
pub enum RerankBehavior {
    /// Return these items.
    Return(Vec<RankedItem>),
    /// Fail with a provider error.
    Fail,
    /// Keep candidates in reverse order, scoring them descending.
    Reverse,
}

pub struct ScriptedReranker {
    pub behavior: RerankBehavior,
    pub calls: AtomicUsize,
    pub last_candidates: Mutex<Vec<String>>,
}

impl ScriptedReranker {
    pub fn new(behavior: RerankBehavior) -> Self {
        Self { behavior, calls: AtomicUsize::new(0), last_candidates: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RerankProvider for ScriptedReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_candidates.lock().unwrap() = candidates.to_vec();
        match &self.behavior {
            RerankBehavior::Return(items) => Ok(items.clone()),
            RerankBehavior::Fail => Err(RagError::provider(Stage::Rerank, "status 503")),
            RerankBehavior::Reverse => Ok(candidates
                .iter()
                .rev()
                .take(top_n)
                .enumerate()
                .map(|(i, text)| RankedItem {
                    document_text: text.clone(),
                    relevance_score: 1.0 - i as f32 * 0.1,
                })
                .collect()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-reranker"
    }
}

/// Records every prompt and answers with a fixed reply, or fails.
pub struct RecordingGenerator {
    pub reply: String,
    pub fail: AtomicBool,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), fail: AtomicBool::new(false), prompts: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RagError::provider(Stage::Generation, "model overloaded"));
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "recording-llm"
    }
}

pub fn retrieved(texts: &[&str]) -> Vec<RetrievedItem> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| RetrievedItem {
            id: format!("doc-{i}"),
            document_text: text.to_string(),
            metadata: Default::default(),
            distance: 0.1 * (i + 1) as f32,
        })
        .collect()
}

pub fn ranked(texts: &[&str]) -> Vec<RankedItem> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| RankedItem {
            document_text: text.to_string(),
            relevance_score: 0.9 - 0.1 * i as f32,
        })
        .collect()
}

/// The fakes behind an orchestrator, kept for call-count assertions.
pub struct Harness {
    pub embedder: Arc<KeywordEmbedder>,
    pub store: Arc<ScriptedStore>,
    pub reranker: Arc<ScriptedReranker>,
    pub generator: Arc<RecordingGenerator>,
    pub orchestrator: RagOrchestrator,
}

pub fn harness(store: ScriptedStore, rerank: RerankBehavior) -> Harness {
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = Arc::new(store);
    let reranker = Arc::new(ScriptedReranker::new(rerank));
    let generator = Arc::new(RecordingGenerator::new("generated answer"));
    let orchestrator = RagOrchestrator::builder()
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .reranker(reranker.clone())
        .generator(generator.clone())
        .build()
        .expect("all providers set");
    Harness { embedder, store, reranker, generator, orchestrator }
}
