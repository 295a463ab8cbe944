//! Shopsift LLM - keyword and filter extraction
//!
//! Defines the `KeywordExtractor` interface the batch runner depends on, the
//! deterministic fallback applied when extraction fails, model-output
//! parsing, and an OpenAI chat-completions provider.

use async_trait::async_trait;
use shopsift_core::{KeywordExtraction, LlmError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

pub mod parse;
pub mod prompt;
pub mod providers;

pub use parse::{parse_extraction_output, strip_code_fence};
pub use prompt::build_extraction_prompt;
pub use providers::{OpenAIClient, OpenAIKeywordExtractor};

// ============================================================================
// EXTRACTOR TRAIT
// ============================================================================

/// Turns free text into keywords, a filter intent and a cleaned query.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Extract from `text`. Empty or malformed model output is an error;
    /// callers decide whether to fall back.
    async fn extract(&self, text: &str) -> Result<KeywordExtraction, LlmError>;

    /// Model identifier reported in row output.
    fn model_id(&self) -> &str;
}

/// Short reason recorded in the fallback's reasoning note.
pub fn fallback_reason(error: &LlmError) -> &'static str {
    match error {
        LlmError::EmptyResponse { .. } => "empty API response",
        LlmError::InvalidResponse { reason, .. } if reason.contains("JSON") => "JSON parse error",
        LlmError::InvalidResponse { .. } => "empty or invalid API response",
        LlmError::ProviderNotConfigured
        | LlmError::RequestFailed { .. }
        | LlmError::RateLimited { .. } => "API error",
    }
}

/// Extract, substituting the deterministic fallback on any failure.
/// Returns the extraction and whether it was a fallback.
pub async fn extract_or_fallback(
    extractor: &dyn KeywordExtractor,
    text: &str,
) -> (KeywordExtraction, bool) {
    match extractor.extract(text).await {
        Ok(extraction) => {
            tracing::debug!(confidence = extraction.confidence, "Keywords extracted");
            (extraction, false)
        }
        Err(e) => {
            let reason = fallback_reason(&e);
            tracing::warn!(error = %e, reason, "Extraction failed, using original query");
            (KeywordExtraction::fallback(text, reason), true)
        }
    }
}

// ============================================================================
// MOCK EXTRACTOR FOR TESTING
// ============================================================================

/// Scripted extractor. Unscripted inputs get a simple whitespace split with
/// no filters.
#[derive(Debug)]
pub struct MockKeywordExtractor {
    model_id: String,
    responses: RwLock<HashMap<String, Result<KeywordExtraction, LlmError>>>,
    calls: AtomicUsize,
}

impl MockKeywordExtractor {
    pub fn new() -> Self {
        Self {
            model_id: "mock-extractor".to_string(),
            responses: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Script the result for an exact input text.
    pub fn with_response(self, text: impl Into<String>, extraction: KeywordExtraction) -> Self {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(text.into(), Ok(extraction));
        }
        self
    }

    /// Script a failure for an exact input text.
    pub fn with_error(self, text: impl Into<String>, error: LlmError) -> Self {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(text.into(), Err(error));
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for MockKeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeywordExtractor for MockKeywordExtractor {
    async fn extract(&self, text: &str) -> Result<KeywordExtraction, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let scripted = self
            .responses
            .read()
            .ok()
            .and_then(|responses| responses.get(text).cloned());
        if let Some(result) = scripted {
            return result;
        }
        let keywords: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        Ok(KeywordExtraction {
            clean_query: keywords.join(" "),
            keywords,
            filters: Default::default(),
            confidence: 0.8,
            reasoning: "mock extraction".to_string(),
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shopsift_core::{SemanticFilterIntent, FALLBACK_CONFIDENCE};
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_returns_scripted_extraction() {
        let scripted = KeywordExtraction {
            keywords: vec!["blue".to_string(), "shirts".to_string()],
            filters: SemanticFilterIntent::new()
                .with("colors", json!(["blue"]))
                .with("productType", json!("shirts")),
            clean_query: "blue shirts".to_string(),
            confidence: 0.95,
            reasoning: String::new(),
        };
        let mock = MockKeywordExtractor::new().with_response("i want blue shirts", scripted.clone());
        let result = mock.extract("i want blue shirts").await.unwrap();
        assert_eq!(result, scripted);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_default_splits_words() {
        let mock = MockKeywordExtractor::new();
        let result = mock.extract("Red Dress").await.unwrap();
        assert_eq!(result.keywords, vec!["red", "dress"]);
        assert_eq!(result.clean_query, "red dress");
    }

    #[tokio::test]
    async fn test_extract_or_fallback_on_error() {
        let mock = MockKeywordExtractor::new().with_error(
            "broken",
            LlmError::InvalidResponse {
                provider: "mock".to_string(),
                reason: "JSON parse error: expected value".to_string(),
            },
        );
        let (extraction, fell_back) = extract_or_fallback(&mock, "broken").await;
        assert!(fell_back);
        assert_eq!(extraction.clean_query, "broken");
        assert_eq!(extraction.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(
            extraction.reasoning,
            "fallback to original query due to JSON parse error"
        );
    }

    #[tokio::test]
    async fn test_extract_or_fallback_passes_success_through() {
        let mock = MockKeywordExtractor::new();
        let (extraction, fell_back) = extract_or_fallback(&mock, "hats").await;
        assert!(!fell_back);
        assert_eq!(extraction.keywords, vec!["hats"]);
    }

    #[test]
    fn test_fallback_reason_mapping() {
        assert_eq!(
            fallback_reason(&LlmError::EmptyResponse {
                provider: "openai".to_string()
            }),
            "empty API response"
        );
        assert_eq!(fallback_reason(&LlmError::ProviderNotConfigured), "API error");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Whatever the failure, the fallback keeps the original text as the
        /// clean query with confidence 0.5.
        #[test]
        fn prop_fallback_preserves_text(text in "[a-zA-Z0-9 ]{1,40}") {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let mock = MockKeywordExtractor::new()
                .with_error(text.clone(), LlmError::EmptyResponse { provider: "mock".to_string() });
            let (extraction, fell_back) = rt.block_on(extract_or_fallback(&mock, &text));
            prop_assert!(fell_back);
            prop_assert_eq!(extraction.clean_query, text);
            prop_assert_eq!(extraction.confidence, 0.5);
        }
    }
}
