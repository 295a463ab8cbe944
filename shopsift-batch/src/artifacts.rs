//! Serialization of the per-row result fields.

use serde::Serialize;
use serde_json::{json, Value};
use shopsift_core::{KeywordExtraction, StorageError};

/// Replace string leaves that hold JSON objects or arrays with the parsed
/// value, recursively.
pub fn decode_nested_json(value: &Value) -> Value {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(parsed) => decode_nested_json(&parsed),
                    Err(_) => value.clone(),
                }
            } else {
                value.clone()
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(decode_nested_json).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_nested_json(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Pretty JSON of a raw response with embedded JSON text expanded.
pub fn pretty_response(raw: &Value) -> Result<String, StorageError> {
    to_pretty(&decode_nested_json(raw))
}

pub fn to_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string_pretty(value).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}

/// The extraction as persisted in `json_output`.
pub fn extraction_json(extraction: &KeywordExtraction) -> Result<String, StorageError> {
    to_pretty(&json!({
        "keywords": extraction.keywords,
        "filters": extraction.filters,
        "cleanQuery": extraction.clean_query,
        "confidence": extraction.confidence,
        "reasoning": extraction.reasoning,
    }))
}

/// `"<model> (confidence: 0.xx)"`.
pub fn model_info(model: &str, confidence: f64) -> String {
    format!("{} (confidence: {:.2})", model, confidence)
}

/// `api_response` of a failed item.
pub fn error_response(error: &str) -> Result<String, StorageError> {
    to_pretty(&json!({ "error": error }))
}
