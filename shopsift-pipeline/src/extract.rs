//! Shape detection for search response envelopes.
//!
//! A payload field (`products`, `available_filters`, ...) can sit at the top
//! level, inside a JSON-RPC `result`, or inside a typed content block whose
//! `text` is itself JSON. Each location is one extractor; they are tried in
//! order and the first hit wins. A new envelope shape is one more entry in
//! `PAYLOAD_EXTRACTORS`.

use serde_json::{Map, Value};

/// Returns the object that holds `key`, when this shape applies.
pub type PayloadExtractor = fn(&Value, &str) -> Option<Map<String, Value>>;

pub const PAYLOAD_EXTRACTORS: &[(&str, PayloadExtractor)] = &[
    ("top_level", top_level),
    ("result_object", result_object),
    ("content_blocks", content_blocks),
];

/// An object found by an extractor, with the extractor's name.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedPayload {
    pub source: &'static str,
    pub payload: Map<String, Value>,
}

impl LocatedPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

fn holding(object: Option<&Map<String, Value>>, key: &str) -> Option<Map<String, Value>> {
    object
        .filter(|obj| obj.get(key).map(|v| !v.is_null()).unwrap_or(false))
        .cloned()
}

fn top_level(response: &Value, key: &str) -> Option<Map<String, Value>> {
    holding(response.as_object(), key)
}

fn result_object(response: &Value, key: &str) -> Option<Map<String, Value>> {
    holding(response.get("result").and_then(Value::as_object), key)
}

fn content_blocks(response: &Value, key: &str) -> Option<Map<String, Value>> {
    let block_lists = [
        response.get("result").and_then(|r| r.get("content")),
        response.get("content"),
    ];
    block_lists
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .filter(|text| text.trim_start().starts_with('{'))
        .filter_map(|text| serde_json::from_str::<Value>(text).ok())
        .find_map(|inner| holding(inner.as_object(), key))
}

/// First object holding a non-null `key`, searched in priority order.
pub fn locate(response: &Value, key: &str) -> Option<LocatedPayload> {
    PAYLOAD_EXTRACTORS.iter().find_map(|(source, extractor)| {
        extractor(response, key).map(|payload| LocatedPayload { source, payload })
    })
}

/// First array stored under `key`, or `None` when no shape carries one.
pub fn locate_array(response: &Value, key: &str) -> Option<Vec<Value>> {
    PAYLOAD_EXTRACTORS.iter().find_map(|(_, extractor)| {
        extractor(response, key).and_then(|payload| match payload.get(key) {
            Some(Value::Array(items)) => Some(items.clone()),
            _ => None,
        })
    })
}
