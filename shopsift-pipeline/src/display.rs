//! Display form of a FilterSpec with marked headline sections.

use serde_json::{Map, Value};
use shopsift_core::FilterSpec;

const DISPLAY_KEYS: &[(&str, &str)] = &[
    ("user_intent_filters", "🎯 user_intent_filters"),
    ("applied_query_filters", "⚙️ applied_query_filters"),
    ("result_statistics", "📊 result_statistics"),
];

/// Same fields, in the same order, with the three headline keys renamed.
pub fn format_filter_spec(spec: &FilterSpec) -> Map<String, Value> {
    match serde_json::to_value(spec) {
        Ok(Value::Object(fields)) => format_fields(fields),
        _ => Map::new(),
    }
}

/// Rename headline keys of an already serialized spec.
pub fn format_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let display = DISPLAY_KEYS
                .iter()
                .find(|(plain, _)| *plain == key)
                .map(|(_, display)| display.to_string())
                .unwrap_or(key);
            (display, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopsift_core::SemanticFilterIntent;

    #[test]
    fn test_headline_keys_renamed() {
        let spec = FilterSpec::new(
            SemanticFilterIntent::new().with("colors", json!(["blue"])),
            vec!["Price".to_string()],
        );
        let formatted = format_filter_spec(&spec);
        let keys: Vec<&str> = formatted.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "🎯 user_intent_filters",
                "api_available_filters",
                "⚙️ applied_query_filters",
                "📊 result_statistics",
                "mapping_notes",
                "validation_status",
                "confidence_score",
            ]
        );
        assert_eq!(formatted["🎯 user_intent_filters"], json!({"colors": ["blue"]}));
        assert_eq!(formatted["validation_status"], json!("pending"));
    }

    #[test]
    fn test_non_spec_fields_pass_through() {
        let mut fields = Map::new();
        fields.insert("other".to_string(), json!(1));
        assert_eq!(format_fields(fields.clone()), fields);
    }
}
