//! Generation provider trait and the grounded-answer prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Upper bound on generated tokens; provider default when `None`.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { max_tokens: None, temperature: DEFAULT_TEMPERATURE }
    }
}

impl GenerateOptions {
    /// Set the token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Render the grounded-answer prompt. The wording is fixed; downstream
/// evaluation relies on it byte for byte.
pub fn grounded_prompt(context: &str, question: &str) -> String {
    format!(
        "基于以下上下文回答问题：\n\n上下文：\n{context}\n\n问题：{question}\n\n请根据上下文回答问题。如果上下文中没有相关信息，请说明无法基于提供的上下文回答问题。"
    )
}

/// A provider that turns a prompt into generated text.
///
/// Failures are reported as [`RagError::Provider`](crate::RagError::Provider)
/// with [`Stage::Generation`](crate::Stage::Generation).
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for `prompt`. An empty prompt yields an empty string
    /// without a remote call.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;

    /// Answer `question` using only `context`, via [`grounded_prompt`].
    async fn generate_with_context(
        &self,
        context: &str,
        question: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        if context.is_empty() && question.is_empty() {
            warn!("both context and question are empty, skipping generation");
            return Ok(String::new());
        }
        self.generate(&grounded_prompt(context, question), options).await
    }

    /// The model name reported in system diagnostics.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_context_and_question_verbatim() {
        let prompt = grounded_prompt("line one\nline two", "what?");
        assert_eq!(
            prompt,
            "基于以下上下文回答问题：\n\n上下文：\nline one\nline two\n\n问题：what?\n\n\
             请根据上下文回答问题。如果上下文中没有相关信息，请说明无法基于提供的上下文回答问题。"
        );
    }

    #[test]
    fn default_temperature_is_point_seven() {
        let options = GenerateOptions::default();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, None);
        assert_eq!(options.max_tokens(256).max_tokens, Some(256));
    }
}
