//! Keyword extraction over chat completions.

use super::client::{OpenAIClient, DEFAULT_REQUESTS_PER_MINUTE};
use super::types::{CompletionRequest, CompletionResponse};
use crate::parse::parse_extraction_output;
use crate::prompt::build_extraction_prompt;
use crate::KeywordExtractor;
use async_trait::async_trait;
use shopsift_core::{KeywordExtraction, LlmConfig, LlmError};
use std::time::Duration;

const PROVIDER: &str = "openai";

/// Language hint in the prompt; the model detects it from the query.
const PROMPT_LANGUAGE: &str = "auto-detect";

/// Keyword extractor backed by a chat-completions model.
pub struct OpenAIKeywordExtractor {
    client: OpenAIClient,
    model: String,
    max_completion_tokens: u32,
}

impl OpenAIKeywordExtractor {
    /// Build from configuration; fails when no API key is set.
    pub fn from_config(config: &LlmConfig, timeout: Duration) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(LlmError::ProviderNotConfigured)?;
        let mut client = OpenAIClient::new(api_key, DEFAULT_REQUESTS_PER_MINUTE, timeout)?;
        if let Some(base_url) = &config.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(Self {
            client,
            model: config.model.clone(),
            max_completion_tokens: config.max_completion_tokens,
        })
    }

    fn request_for(&self, text: &str) -> CompletionRequest {
        CompletionRequest::single_prompt(
            self.model.clone(),
            build_extraction_prompt(text, PROMPT_LANGUAGE),
            self.max_completion_tokens,
        )
    }
}

#[async_trait]
impl KeywordExtractor for OpenAIKeywordExtractor {
    async fn extract(&self, text: &str) -> Result<KeywordExtraction, LlmError> {
        let response: CompletionResponse = self.client.complete(&self.request_for(text)).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "Extraction usage"
            );
        }

        let content = response.into_content().ok_or_else(|| LlmError::EmptyResponse {
            provider: PROVIDER.to_string(),
        })?;

        tracing::debug!(
            model = %self.model,
            preview = %content.chars().take(200).collect::<String>(),
            "Raw extraction response"
        );

        parse_extraction_output(&content, PROVIDER)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAIKeywordExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIKeywordExtractor")
            .field("model", &self.model)
            .field("max_completion_tokens", &self.max_completion_tokens)
            .finish()
    }
}
