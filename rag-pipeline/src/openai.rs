//! OpenAI-compatible embedding and chat providers.
//!
//! Both providers speak the OpenAI REST dialect (`/embeddings`,
//! `/chat/completions`) against a configurable base URL, so they work with
//! any compatible inference gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::ProviderConfig;
use crate::document::Embedding;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::generation::{GenerateOptions, GenerationProvider};

/// Build an HTTP client with the configured timeout, after validating the
/// configuration for `stage`.
pub(crate) fn http_client(config: &ProviderConfig, stage: Stage) -> Result<reqwest::Client> {
    config.validate(stage)?;
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| RagError::Config(format!("failed to build {stage} HTTP client: {e}")))
}

/// Send a JSON POST and return the response if its status is a success.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    config: &ProviderConfig,
    url: &str,
    body: &B,
    stage: Stage,
) -> Result<reqwest::Response> {
    let response =
        client.post(url).bearer_auth(&config.api_key).json(body).send().await.map_err(|e| {
            let kind = if e.is_timeout() { "request timed out" } else { "request failed" };
            error!(%stage, url, error = %e, "{kind}");
            RagError::provider(stage, format!("{kind}: {e}"))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

        error!(%stage, %status, "API error");
        return Err(RagError::provider(stage, format!("API returned {status}: {detail}")));
    }

    Ok(response)
}

/// Decode a JSON response body.
pub(crate) async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    stage: Stage,
) -> Result<T> {
    response.json().await.map_err(|e| {
        error!(%stage, error = %e, "failed to parse response");
        RagError::provider(stage, format!("failed to parse response: {e}"))
    })
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// Each call to [`embed`](EmbeddingProvider::embed) issues a single batched
/// request for all input texts.
///
/// # Example
///
/// ```rust,ignore
/// use rag_pipeline::{OpenAIEmbeddingProvider, ProviderConfig};
///
/// let provider = OpenAIEmbeddingProvider::new(ProviderConfig::new(
///     "sk-...",
///     "https://api.example.com/v1",
///     "bge-large-zh-v1.5",
/// ))?;
/// let embeddings = provider.embed(&["hello world"]).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the api key, base url, or model name is
    /// empty, or the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config, Stage::Embedding)?;
        debug!(provider = "openai", model = %config.model_name, "embedding provider ready");
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "openai",
            batch_size = texts.len(),
            model = %self.config.model_name,
            "embedding batch"
        );

        let request_body = EmbeddingRequest { model: &self.config.model_name, input: texts };
        let url = self.config.endpoint("embeddings");
        let response =
            post_json(&self.client, &self.config, &url, &request_body, Stage::Embedding).await?;
        let mut parsed: EmbeddingResponse = read_json(response, Stage::Embedding).await?;

        if parsed.data.len() != texts.len() {
            error!(
                provider = "openai",
                expected = texts.len(),
                actual = parsed.data.len(),
                "embedding count mismatch"
            );
            return Err(RagError::provider(
                Stage::Embedding,
                format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Embedding> = parsed.data.into_iter().map(|d| d.embedding).collect();
        debug!(
            provider = "openai",
            dimensions = embeddings.first().map_or(0, Vec::len),
            "embedding batch complete"
        );
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`GenerationProvider`] backed by an OpenAI-compatible `/chat/completions`
/// endpoint. The prompt is sent as a single user message.
pub struct OpenAIChatProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl OpenAIChatProvider {
    /// Create a new provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the api key, base url, or model name is
    /// empty, or the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config, Stage::Generation)?;
        debug!(provider = "openai", model = %config.model_name, "chat provider ready");
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerationProvider for OpenAIChatProvider {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        if prompt.is_empty() {
            tracing::warn!(provider = "openai", "empty prompt, skipping generation");
            return Ok(String::new());
        }

        debug!(
            provider = "openai",
            model = %self.config.model_name,
            temperature = options.temperature,
            "generating"
        );

        let request_body = ChatRequest {
            model: &self.config.model_name,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let url = self.config.endpoint("chat/completions");
        let response =
            post_json(&self.client, &self.config, &url, &request_body, Stage::Generation).await?;
        let parsed: ChatResponse = read_json(response, Stage::Generation).await?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            error!(provider = "openai", "response contained no choices");
            RagError::provider(Stage::Generation, "response contained no choices")
        })?;
        let text = choice.message.content.unwrap_or_default();
        debug!(provider = "openai", chars = text.chars().count(), "generation complete");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
