//! Configuration for providers, the vector store, logging, and answering.
//!
//! Settings are plain values: build them by hand or load them from the
//! environment with [`RagSettings::from_env`], then pass them to the
//! provider constructors and the orchestrator builder.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{RagError, Result, Stage};
use crate::vectorstore::DistanceMetric;

/// Base URL used by every provider when none is configured.
pub const DEFAULT_BASE_URL: &str = "/api/inference/v1";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-large-zh-v1.5";

/// Default reranker model.
pub const DEFAULT_RERANKER_MODEL: &str = "bge-reranker-v2-m3";

/// Default generation model.
pub const DEFAULT_LLM_MODEL: &str = "GLM-4.6-FP8";

/// Default collection name.
pub const DEFAULT_COLLECTION_NAME: &str = "rag_collection";

/// Default timeout applied to every outbound provider call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one remote provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Bearer token. Mandatory.
    pub api_key: String,
    /// Base URL of the OpenAI-style API, without a trailing endpoint path.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model_name: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Create a provider configuration with the default timeout.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model_name: model_name.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Check that all fields needed to reach the provider are present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] naming the first empty field.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RagError::Config(format!("{stage} api_key must not be empty")));
        }
        if self.base_url.trim().is_empty() {
            return Err(RagError::Config(format!("{stage} base_url must not be empty")));
        }
        if self.model_name.trim().is_empty() {
            return Err(RagError::Config(format!("{stage} model_name must not be empty")));
        }
        Ok(())
    }

    fn redacted(&self) -> Value {
        json!({
            "api_key": if self.api_key.is_empty() { "" } else { "***" },
            "base_url": self.base_url,
            "model_name": self.model_name,
            "timeout_secs": self.timeout_secs,
        })
    }
}

/// Settings for the vector store collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Name of the collection to open or create.
    pub collection_name: String,
    /// Directory for the on-disk snapshot; memory only when `None`.
    pub persist_directory: Option<PathBuf>,
    /// Distance metric used for new collections.
    pub distance: DistanceMetric,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            persist_directory: None,
            distance: DistanceMetric::default(),
        }
    }
}

/// Settings consumed by the front end when installing a log subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Level directive, e.g. `INFO` or `rag_pipeline=debug`.
    pub level: String,
    /// Optional log file written alongside the console output.
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "INFO".to_string(), file_path: Some(PathBuf::from("logs/rag_system.log")) }
    }
}

/// Per-question parameters for [`RagOrchestrator::answer`](crate::RagOrchestrator::answer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptions {
    /// Whether to rerank retrieved passages before generation.
    pub use_rerank: bool,
    /// Maximum number of passages to retrieve.
    pub retrieve_limit: usize,
    /// Maximum number of passages placed in the context.
    pub top_n: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self { use_rerank: true, retrieve_limit: 5, top_n: 3 }
    }
}

impl AnswerOptions {
    /// Enable or disable reranking.
    pub fn use_rerank(mut self, use_rerank: bool) -> Self {
        self.use_rerank = use_rerank;
        self
    }

    /// Set the retrieval limit.
    pub fn retrieve_limit(mut self, limit: usize) -> Self {
        self.retrieve_limit = limit;
        self
    }

    /// Set how many passages form the context.
    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

/// All settings for a RAG deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagSettings {
    /// Embedding provider connection.
    pub embedding: ProviderConfig,
    /// Rerank provider connection.
    pub reranker: ProviderConfig,
    /// Generation provider connection.
    pub llm: ProviderConfig,
    /// Vector store collection.
    pub store: StoreConfig,
    /// Log level and file.
    pub logging: LoggingConfig,
    /// Defaults for answering questions.
    pub answer: AnswerOptions,
}

impl RagSettings {
    /// Create settings from three provider configurations, with default
    /// store, logging, and answer settings.
    pub fn new(embedding: ProviderConfig, reranker: ProviderConfig, llm: ProviderConfig) -> Self {
        Self {
            embedding,
            reranker,
            llm,
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            answer: AnswerOptions::default(),
        }
    }

    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a numeric or enumerated variable cannot
    /// be parsed. Missing API keys are reported by [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Unset or blank variables fall back to their defaults, except API keys
    /// which stay empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let timeout_secs = match get("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                RagError::Config(format!(
                    "PROVIDER_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let provider = |prefix: &str, default_model: &str| ProviderConfig {
            api_key: get(format!("{prefix}_API_KEY").as_str()).unwrap_or_default(),
            base_url: or(format!("{prefix}_BASE_URL").as_str(), DEFAULT_BASE_URL),
            model_name: or(format!("{prefix}_MODEL_NAME").as_str(), default_model),
            timeout_secs,
        };

        let distance = match get("VECTOR_DISTANCE") {
            Some(raw) => raw.parse()?,
            None => DistanceMetric::default(),
        };

        Ok(Self {
            embedding: provider("EMBEDDING", DEFAULT_EMBEDDING_MODEL),
            reranker: provider("RERANKER", DEFAULT_RERANKER_MODEL),
            llm: provider("LLM", DEFAULT_LLM_MODEL),
            store: StoreConfig {
                collection_name: or("CHROMA_COLLECTION_NAME", DEFAULT_COLLECTION_NAME),
                persist_directory: get("CHROMA_PERSIST_DIRECTORY").map(PathBuf::from),
                distance,
            },
            logging: LoggingConfig {
                level: or("LOG_LEVEL", "INFO"),
                file_path: Some(PathBuf::from(or("LOG_FILE_PATH", "logs/rag_system.log"))),
            },
            answer: AnswerOptions::default(),
        })
    }

    /// Check that every mandatory API key is present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] listing all missing keys.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            (&self.embedding, "EMBEDDING_API_KEY"),
            (&self.reranker, "RERANKER_API_KEY"),
            (&self.llm, "LLM_API_KEY"),
        ]
        .into_iter()
        .filter(|(provider, _)| provider.api_key.trim().is_empty())
        .map(|(_, name)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RagError::Config(format!(
                "missing required API key configuration: {}",
                missing.join(", ")
            )))
        }
    }

    /// A JSON view of the settings with API keys masked.
    pub fn redacted(&self) -> Value {
        json!({
            "embedding": self.embedding.redacted(),
            "reranker": self.reranker.redacted(),
            "llm": self.llm.redacted(),
            "database": {
                "collection_name": self.store.collection_name,
                "persist_directory": self.store.persist_directory,
                "distance": self.store.distance,
            },
            "logging": {
                "level": self.logging.level,
                "file_path": self.logging.file_path,
            },
        })
    }
}
