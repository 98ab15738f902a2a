//! # rag-pipeline
//!
//! Retrieval-augmented generation orchestration: turn documents into stored
//! vectors, and turn questions into answers grounded in the retrieved text.
//!
//! The pipeline coordinates four independently failing capabilities, each
//! behind an async trait:
//!
//! - [`EmbeddingProvider`]: text → vectors ([`OpenAIEmbeddingProvider`])
//! - [`VectorStore`]: nearest-neighbour storage ([`InMemoryVectorStore`])
//! - [`RerankProvider`]: relevance reordering ([`HttpRerankProvider`])
//! - [`GenerationProvider`]: prompt → text ([`OpenAIChatProvider`])
//!
//! [`RagOrchestrator`] composes them and defines how each stage degrades.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rag_pipeline::{AnswerOptions, RagOrchestrator, RagSettings};
//!
//! let orchestrator = RagOrchestrator::from_settings(RagSettings::from_env()?).await?;
//! orchestrator
//!     .ingest(&["AI is a branch of computer science.", "Machine learning is a subfield of AI."], None, None)
//!     .await;
//!
//! let result = orchestrator.answer("What is AI?", AnswerOptions::default().use_rerank(false)).await;
//! println!("{}", result.answer);
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod openai;
pub mod pipeline;
pub mod rerank_http;
pub mod reranker;
pub mod vectorstore;

pub use config::{AnswerOptions, LoggingConfig, ProviderConfig, RagSettings, StoreConfig};
pub use document::{
    AnswerResult, CollectionInfo, Document, Embedding, Metadata, RankedItem, RetrievedItem,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, Stage};
pub use generation::{GenerateOptions, GenerationProvider, grounded_prompt};
pub use inmemory::InMemoryVectorStore;
pub use openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
pub use pipeline::{
    ERROR_ANSWER_PREFIX, EMPTY_QUESTION_ANSWER, NO_CONTEXT_ANSWER, RagOrchestrator,
    RagOrchestratorBuilder, SystemInfo,
};
pub use rerank_http::HttpRerankProvider;
pub use reranker::RerankProvider;
pub use vectorstore::{DistanceMetric, VectorStore};
