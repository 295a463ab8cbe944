//! OpenAI API request and response types

use serde::{Deserialize, Serialize};

/// Body of `POST /chat/completions`.
///
/// The output cap goes out as `max_completion_tokens`; reasoning-era models
/// reject the legacy `max_tokens` field.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Single-turn request: the extraction prompt as the only user message.
    pub fn single_prompt(model: impl Into<String>, prompt: impl Into<String>, max_completion_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            max_completion_tokens: Some(max_completion_tokens),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// Text of the first choice, when it has any.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: i64,
    pub completion_tokens: Option<i64>,
    pub total_tokens: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_caps_completion_tokens() {
        let request = CompletionRequest::single_prompt("gpt-4o-mini", "extract: blue shirts", 500);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "extract: blue shirts"}],
                "max_completion_tokens": 500
            })
        );
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_content_of_first_choice() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"keywords\": []}"}, "finish_reason": "stop"},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 120, "completion_tokens": 14, "total_tokens": 134}
        }))
        .unwrap();
        assert_eq!(response.usage.as_ref().map(|u| u.total_tokens), Some(134));
        assert_eq!(response.into_content().as_deref(), Some("{\"keywords\": []}"));
    }

    #[test]
    fn test_blank_or_missing_content_is_none() {
        let blank: CompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"role": "assistant", "content": "  "}}]})).unwrap();
        assert_eq!(blank.into_content(), None);
        let empty: CompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(empty.into_content(), None);
    }
}
