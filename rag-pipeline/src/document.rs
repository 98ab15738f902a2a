//! Data types for documents, retrieval hits, and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key-value metadata attached to a stored document.
pub type Metadata = HashMap<String, String>;

/// A fixed-length vector produced by an [`EmbeddingProvider`](crate::EmbeddingProvider).
pub type Embedding = Vec<f32>;

/// Metadata key written when a caller supplies no metadata.
pub const DEFAULT_SOURCE_KEY: &str = "source";

/// Metadata value written when a caller supplies no metadata.
pub const DEFAULT_SOURCE_VALUE: &str = "default";

/// A text document as stored in a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier within the collection.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a freshly generated id and the default metadata
    /// (`{"source": "default"}`).
    pub fn new(text: impl Into<String>) -> Self {
        Self { id: generate_id(), text: text.into(), metadata: default_metadata() }
    }

    /// Replace the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Replace the default metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The metadata used for documents ingested without any.
pub fn default_metadata() -> Metadata {
    HashMap::from([(DEFAULT_SOURCE_KEY.to_string(), DEFAULT_SOURCE_VALUE.to_string())])
}

/// Generate a new unique document id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A document returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedItem {
    /// The id the document was stored under.
    pub id: String,
    /// The stored text, unchanged.
    pub document_text: String,
    /// The stored metadata.
    pub metadata: Metadata,
    /// Store-defined distance to the query (smaller is more similar).
    pub distance: f32,
}

/// A passage scored by a [`RerankProvider`](crate::RerankProvider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedItem {
    /// The passage text.
    pub document_text: String,
    /// Provider-defined relevance (higher is more relevant).
    pub relevance_score: f32,
}

/// Summary of a vector store collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Number of stored documents.
    pub count: usize,
    /// Where the collection is persisted, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_directory: Option<String>,
}

/// The outcome of answering a question.
///
/// `retrieved` is ordered by increasing distance, `reranked` by decreasing
/// relevance. `context` is exactly the text handed to generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnswerResult {
    /// The question as asked.
    pub question: String,
    /// Newline-joined passages given to the generation provider.
    pub context: String,
    /// The generated answer, or a message explaining why none was produced.
    pub answer: String,
    /// Retrieval hits in store order.
    pub retrieved: Vec<RetrievedItem>,
    /// Reranked passages; empty when reranking was skipped or failed.
    pub reranked: Vec<RankedItem>,
}

impl AnswerResult {
    /// A result with no context and a fixed explanatory answer.
    pub(crate) fn terminal(question: &str, answer: impl Into<String>) -> Self {
        Self { question: question.to_string(), answer: answer.into(), ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_gets_default_metadata_and_unique_id() {
        let a = Document::new("alpha");
        let b = Document::new("alpha");
        assert_ne!(a.id, b.id);
        assert_eq!(a.metadata.get("source").map(String::as_str), Some("default"));
    }

    #[test]
    fn builder_overrides_id_and_metadata() {
        let doc = Document::new("alpha")
            .with_id("doc-1")
            .with_metadata(HashMap::from([("lang".to_string(), "en".to_string())]));
        assert_eq!(doc.id, "doc-1");
        assert!(!doc.metadata.contains_key("source"));
    }
}
