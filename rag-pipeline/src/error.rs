//! Error types for the `rag-pipeline` crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The remote capability a [`RagError::Provider`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Text → vector embedding.
    Embedding,
    /// Query/passage relevance scoring.
    Rerank,
    /// Text generation from a prompt.
    Generation,
}

impl Stage {
    /// Return the lowercase stage label used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Embedding => "embedding",
            Stage::Rerank => "rerank",
            Stage::Generation => "generation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required setting is missing or invalid. Raised at construction time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote provider call failed (timeout, network error, non-success status,
    /// or an unreadable response).
    #[error("Provider error ({stage}): {message}")]
    Provider {
        /// The pipeline stage whose provider failed.
        stage: Stage,
        /// A description of the failure.
        message: String,
    },

    /// A vector store read or write failed.
    #[error("Vector store error ({backend}): {message}")]
    Store {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedding's length differs from the collection's dimensionality.
    ///
    /// This means the embedding model changed between ingest and query and is
    /// not recoverable by retrying.
    #[error("Embedding dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality established by the first stored embedding.
        expected: usize,
        /// Dimensionality of the offending embedding.
        actual: usize,
    },
}

impl RagError {
    /// Build a [`RagError::Provider`] for the given stage.
    pub fn provider(stage: Stage, message: impl Into<String>) -> Self {
        RagError::Provider { stage, message: message.into() }
    }

    /// Build a [`RagError::Store`] for the given backend.
    pub fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::Store { backend: backend.into(), message: message.into() }
    }

    /// The provider stage of this error, if it is a [`RagError::Provider`].
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::Provider { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
