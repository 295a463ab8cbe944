//! Parsing of raw model output into a `KeywordExtraction`.

use once_cell::sync::Lazy;
use regex::Regex;
use shopsift_core::{KeywordExtraction, LlmError};

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("Invalid JSON object regex"));

/// Remove a surrounding ```` ```json ```` or ```` ``` ```` fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.ends_with("```") {
        return trimmed;
    }
    for opener in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(opener) {
            if let Some(inner) = rest.strip_suffix("```") {
                return inner.trim();
            }
        }
    }
    trimmed
}

/// Parse model output. Tolerates code fences and prose around the object.
pub fn parse_extraction_output(raw: &str, provider: &str) -> Result<KeywordExtraction, LlmError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyResponse {
            provider: provider.to_string(),
        });
    }

    let unfenced = strip_code_fence(trimmed);
    let candidate = JSON_OBJECT
        .find(unfenced)
        .map(|m| m.as_str())
        .unwrap_or(unfenced);

    serde_json::from_str::<KeywordExtraction>(candidate)
        .map(KeywordExtraction::normalized)
        .map_err(|e| LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("JSON parse error: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"keywords": ["blue", "shirts"], "filters": {"colors": ["blue"], "productType": "shirts"}, "cleanQuery": "blue shirts", "confidence": 0.95}"#;
        let extraction = parse_extraction_output(raw, "openai").unwrap();
        assert_eq!(extraction.keywords, vec!["blue", "shirts"]);
        assert_eq!(extraction.filters.product_type(), Some("shirts"));
        assert_eq!(extraction.clean_query, "blue shirts");
        assert_eq!(extraction.confidence, 0.95);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"keywords\": [\"sale\"], \"filters\": {\"sales\": [\"sale\"]}, \"clean_query\": \"sale items\"}\n```";
        let extraction = parse_extraction_output(raw, "openai").unwrap();
        assert_eq!(extraction.clean_query, "sale items");
        assert_eq!(extraction.confidence, 0.8);
    }

    #[test]
    fn test_parse_json_inside_prose() {
        let raw = "Here you go: {\"keywords\": [], \"filters\": {}, \"cleanQuery\": \"\", \"reasoning\": \"negative intent detected\"} hope that helps";
        let extraction = parse_extraction_output(raw, "openai").unwrap();
        assert!(extraction.keywords.is_empty());
        assert_eq!(extraction.reasoning, "negative intent detected");
        assert!(extraction.clean_query().is_none());
    }

    #[test]
    fn test_parse_empty_output() {
        let err = parse_extraction_output("   ", "openai").unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_extraction_output("no json here", "openai").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { ref reason, .. } if reason.contains("JSON parse error")));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```json{}```"), "{}");
        assert_eq!(strip_code_fence("{}"), "{}");
    }
}
