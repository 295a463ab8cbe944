//! FilterSpec construction, query-string building and result statistics.

use serde_json::{Map, Value};
use shopsift_core::{
    CapabilityDescriptor, FallbackStrategy, FilterConfig, FilterSpec, FilteredResponse,
    ResultStatistics, SemanticFilterIntent, ValidationResult, ValidationStatus,
};

use crate::validator::{category_list, query_mapping, FilterValidator, QueryMapping, COMMON_API_FILTERS};

const TEXT_SEARCH_PREFIX: &str = "text_search_";
const CATEGORY_KEY: &str = "category";
const PRICE_RANGE_KEY: &str = "price_range";

/// Builds and updates the per-item `FilterSpec`.
#[derive(Debug, Clone, Default)]
pub struct FilterMapper {
    config: FilterConfig,
    validator: FilterValidator,
}

impl FilterMapper {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            validator: FilterValidator::new(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Validate `intent` against `available` (or the common names) and record
    /// the applied query filters, status, confidence and notes.
    pub fn create_filter_spec(
        &self,
        intent: &SemanticFilterIntent,
        available: Option<&[String]>,
    ) -> FilterSpec {
        let available: Vec<String> = match available {
            Some(names) => names.to_vec(),
            None => COMMON_API_FILTERS.iter().map(|s| s.to_string()).collect(),
        };
        let validation = self.validator.validate_names(intent, &available);

        let mut spec = FilterSpec::new(intent.clone(), available);
        spec.applied_query_filters = applied_filters(&validation.supported_filters);
        apply_validation(&mut spec, &validation);
        spec
    }

    /// Re-validate against discovered capabilities once a discovery call has
    /// run. Replaces the advertised names; applied query filters are kept.
    pub fn apply_capabilities(&self, spec: &mut FilterSpec, capabilities: &CapabilityDescriptor) {
        let validation = self
            .validator
            .validate_capabilities(&spec.user_intent_filters, capabilities);
        spec.api_available_filters = capabilities.filter_names();
        spec.add_mapping_note(format!(
            "Capability check: {} of {} filters supported",
            validation.supported_filters.len(),
            spec.user_intent_filters.len()
        ));
        apply_validation(spec, &validation);
        if !spec.user_intent_filters.is_empty() && validation.supported_filters.is_empty() {
            spec.validation_status = ValidationStatus::Invalid;
        }
    }

    /// Query for the direct search path: keywords, then the applied filters
    /// as text, then (when broadening) every string term of the intent.
    pub fn map_to_query_string(&self, spec: &mut FilterSpec, keywords: &[String]) -> String {
        let mut parts: Vec<String> = keywords.to_vec();

        parts.extend(
            spec.applied_query_filters
                .iter()
                .filter_map(|(key, value)| filter_to_query(key, value)),
        );

        if self.config.fallback_strategy == FallbackStrategy::BroadenSearch {
            parts.extend(searchable_terms(&spec.user_intent_filters));
        }

        let query = parts.join(" ").trim().to_string();
        spec.add_mapping_note(format!("Final query: '{}'", query));
        query
    }

    pub fn update_result_statistics(&self, spec: &mut FilterSpec, response: &FilteredResponse) {
        spec.result_statistics = Some(ResultStatistics::from_product_types(response.product_types()));
        spec.add_mapping_note("Result statistics updated");
    }
}

fn apply_validation(spec: &mut FilterSpec, validation: &ValidationResult) {
    spec.validation_status = if validation.is_valid {
        ValidationStatus::Valid
    } else {
        ValidationStatus::Partial
    };
    spec.confidence_score = validation.confidence_score;
    for note in &validation.notes {
        spec.add_mapping_note(note.clone());
    }
    if !validation.unsupported_filters.is_empty() {
        spec.add_mapping_note(format!(
            "Unsupported filters: {}",
            category_list(&validation.unsupported_filters)
        ));
    }
}

fn applied_filters(supported: &Map<String, Value>) -> Map<String, Value> {
    let mut applied = Map::new();
    for (category, value) in supported {
        let key = match query_mapping(category).unwrap_or(QueryMapping::TextSearch) {
            QueryMapping::TextSearch => format!("{}{}", TEXT_SEARCH_PREFIX, category),
            QueryMapping::Category => CATEGORY_KEY.to_string(),
            QueryMapping::PriceRange => PRICE_RANGE_KEY.to_string(),
        };
        applied.insert(key, value.clone());
    }
    applied
}

/// Plain text for a JSON value: strings unquoted, everything else as JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn filter_to_query(key: &str, value: &Value) -> Option<String> {
    if key.starts_with(TEXT_SEARCH_PREFIX) {
        return Some(match value {
            Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(" "),
            other => value_text(other),
        });
    }
    match key {
        CATEGORY_KEY => Some(value_text(value)),
        PRICE_RANGE_KEY => {
            let range = value.as_object()?;
            let (min, max) = (range.get("min"), range.get("max"));
            match (truthy(min), truthy(max)) {
                (true, true) => Some(format!(
                    "price between {} and {}",
                    value_text(min?),
                    value_text(max?)
                )),
                (true, false) => Some(format!("price above {}", value_text(min?))),
                (false, true) => Some(format!("price under {}", value_text(max?))),
                (false, false) => None,
            }
        }
        _ => None,
    }
}

/// Every list element and string value of the intent; objects are skipped.
fn searchable_terms(intent: &SemanticFilterIntent) -> Vec<String> {
    let mut terms = Vec::new();
    for (_, value) in intent.iter() {
        match value {
            Value::Array(items) => terms.extend(items.iter().map(value_text)),
            Value::String(s) => terms.push(s.clone()),
            _ => {}
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopsift_core::{FilteredProduct, ResponseStatus};

    fn mapper() -> FilterMapper {
        FilterMapper::default()
    }

    fn product(product_type: Option<&str>) -> FilteredProduct {
        FilteredProduct {
            id: "p".to_string(),
            title: "t".to_string(),
            product_type: product_type.map(str::to_string),
            price_min: None,
            price_max: None,
            currency: "USD".to_string(),
            sizes: vec![],
            available: None,
            variants_count: 0,
            tags: None,
            fit_info: None,
            care_info: None,
            description_summary: None,
        }
    }

    #[test]
    fn test_create_filter_spec_defaults_to_common_filters() {
        let intent = SemanticFilterIntent::new()
            .with("colors", json!(["blue"]))
            .with("productType", json!("shirts"))
            .with("price", json!({"min": 20, "max": 50}));
        let spec = mapper().create_filter_spec(&intent, None);

        assert_eq!(spec.api_available_filters, vec!["Price", "Availability", "Product Type", "Brand"]);
        assert_eq!(spec.validation_status, ValidationStatus::Valid);
        assert_eq!(spec.confidence_score, 1.0);
        assert_eq!(
            spec.applied_query_filters,
            json!({
                "text_search_colors": ["blue"],
                "category": "shirts",
                "price_range": {"min": 20, "max": 50}
            })
            .as_object()
            .cloned()
            .unwrap()
        );
    }

    #[test]
    fn test_partial_spec_notes_unsupported() {
        let intent = SemanticFilterIntent::new()
            .with("colors", json!(["red"]))
            .with("styles", json!(["boho"]));
        let spec = mapper().create_filter_spec(&intent, Some(&[]));
        assert_eq!(spec.validation_status, ValidationStatus::Partial);
        assert_eq!(spec.confidence_score, 0.5);
        let notes: Vec<&str> = spec.note_messages().collect();
        assert!(notes.contains(&"styles: unsupported, suggested: Use text search with style terms"));
        assert_eq!(notes.last(), Some(&"Unsupported filters: ['styles']"));
    }

    #[test]
    fn test_query_string_with_broadening() {
        let intent = SemanticFilterIntent::new()
            .with("colors", json!(["blue"]))
            .with("productType", json!("shirts"))
            .with("price", json!({"max": 50}));
        let mut spec = mapper().create_filter_spec(&intent, None);
        let query = mapper().map_to_query_string(&mut spec, &["cotton".to_string()]);
        assert_eq!(query, "cotton blue shirts price under 50 blue shirts");
        assert_eq!(
            spec.note_messages().last(),
            Some("Final query: 'cotton blue shirts price under 50 blue shirts'")
        );
    }

    #[test]
    fn test_query_string_without_broadening() {
        let mapper = FilterMapper::new(FilterConfig {
            fallback_strategy: FallbackStrategy::None,
            ..Default::default()
        });
        let intent = SemanticFilterIntent::new().with("price", json!({"min": 10, "max": 40}));
        let mut spec = mapper.create_filter_spec(&intent, None);
        assert_eq!(
            mapper.map_to_query_string(&mut spec, &["jeans".to_string()]),
            "jeans price between 10 and 40"
        );
    }

    #[test]
    fn test_price_phrase_treats_zero_as_absent() {
        assert_eq!(
            filter_to_query(PRICE_RANGE_KEY, &json!({"min": 0, "max": 80})),
            Some("price under 80".to_string())
        );
        assert_eq!(
            filter_to_query(PRICE_RANGE_KEY, &json!({"min": 15})),
            Some("price above 15".to_string())
        );
        assert_eq!(filter_to_query(PRICE_RANGE_KEY, &json!({})), None);
        assert_eq!(filter_to_query(PRICE_RANGE_KEY, &json!("cheap")), None);
    }

    #[test]
    fn test_empty_everything_gives_empty_query() {
        let mut spec = mapper().create_filter_spec(&SemanticFilterIntent::new(), None);
        assert_eq!(mapper().map_to_query_string(&mut spec, &[]), "");
    }

    #[test]
    fn test_update_result_statistics() {
        let mut spec = mapper().create_filter_spec(&SemanticFilterIntent::new(), None);
        let response = FilteredResponse::new(
            ResponseStatus::Success,
            vec![product(Some("Shirts")), product(None), product(Some("Shirts"))],
        );
        mapper().update_result_statistics(&mut spec, &response);
        let stats = spec.result_statistics.clone().unwrap();
        assert_eq!(stats.total_products, 3);
        assert!(stats.has_results);
        assert_eq!(stats.product_types.get("Shirts"), Some(&2));
        assert_eq!(stats.product_types.get("Unknown"), Some(&1));
        assert_eq!(spec.note_messages().last(), Some("Result statistics updated"));
    }

    #[test]
    fn test_apply_capabilities_marks_invalid_when_nothing_supported() {
        let intent = SemanticFilterIntent::new().with("colors", json!(["red"]));
        let mut spec = mapper().create_filter_spec(&intent, None);
        assert_eq!(spec.validation_status, ValidationStatus::Valid);

        mapper().apply_capabilities(&mut spec, &CapabilityDescriptor::empty());
        assert_eq!(spec.validation_status, ValidationStatus::Invalid);
        assert_eq!(spec.confidence_score, 0.0);
        assert!(spec.api_available_filters.is_empty());
        assert!(spec
            .note_messages()
            .any(|n| n == "Capability check: 0 of 1 filters supported"));
    }

    #[test]
    fn test_apply_capabilities_partial() {
        let intent = SemanticFilterIntent::new()
            .with("colors", json!(["red"]))
            .with("price", json!({"max": 30}));
        let mut spec = mapper().create_filter_spec(&intent, None);
        let capabilities = CapabilityDescriptor::empty().with_price(true);
        mapper().apply_capabilities(&mut spec, &capabilities);
        assert_eq!(spec.validation_status, ValidationStatus::Partial);
        assert_eq!(spec.api_available_filters, vec!["Price"]);
    }
}
