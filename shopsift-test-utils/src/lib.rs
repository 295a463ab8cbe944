//! Shopsift Test Utilities
//!
//! Shared test infrastructure for the shopsift workspace:
//! - Proptest generators for intents, items and sheet rows
//! - Re-exported mock collaborators
//! - Fixtures for catalog payloads and configuration
//! - Assertions over `ShopsiftResult`

// Re-export mocks from their source crates
pub use shopsift_llm::MockKeywordExtractor;
pub use shopsift_search::MockSearchClient;
pub use shopsift_storage::{InMemoryCheckpointStore, MockRowStore};

pub use shopsift_core::{
    AppConfig, BatchItem, CapabilityDescriptor, ConfigError, KeywordExtraction, SearchError,
    SemanticFilterIntent, SheetRow, ShopsiftError, ShopsiftResult, StorageError,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for pipeline inputs.

    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    pub fn arb_color() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("blue"), Just("red"), Just("Black"), Just("navy"), Just("green"), Just("WHITE"),
        ]
        .prop_map(str::to_string)
    }

    pub fn arb_size() -> impl Strategy<Value = String> {
        prop_oneof![Just("S"), Just("m"), Just("L"), Just("XL"), Just("medium"), Just("30")]
            .prop_map(str::to_string)
    }

    pub fn arb_product_type() -> impl Strategy<Value = String> {
        prop_oneof![Just("shirts"), Just("Jeans"), Just("dresses"), Just("t-shirts"), Just("boots")]
            .prop_map(str::to_string)
    }

    /// A price bound as the model may emit it: number, numeric string or junk.
    pub fn arb_price_bound() -> impl Strategy<Value = Value> {
        prop_oneof![
            (0u32..2000).prop_map(|n| json!(n)),
            (0u32..2000).prop_map(|n| json!(format!("{}", n))),
            (0.0f64..2000.0).prop_map(|n| json!(n)),
            Just(json!("cheap")),
            Just(Value::Null),
        ]
    }

    /// `{min?, max?}` price object.
    pub fn arb_price_intent() -> impl Strategy<Value = Value> {
        (proptest::option::of(arb_price_bound()), proptest::option::of(arb_price_bound())).prop_map(
            |(min, max)| {
                let mut price = serde_json::Map::new();
                if let Some(min) = min {
                    price.insert("min".to_string(), min);
                }
                if let Some(max) = max {
                    price.insert("max".to_string(), max);
                }
                Value::Object(price)
            },
        )
    }

    /// Intent with any subset of categories the adapter knows about.
    pub fn arb_intent() -> impl Strategy<Value = SemanticFilterIntent> {
        (
            prop::collection::vec(arb_color(), 0..3),
            prop::collection::vec(arb_size(), 0..3),
            proptest::option::of(arb_product_type()),
            proptest::option::of(arb_price_intent()),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(colors, sizes, product_type, price, available)| {
                let mut intent = SemanticFilterIntent::new();
                if !colors.is_empty() {
                    intent = intent.with("colors", json!(colors));
                }
                if !sizes.is_empty() {
                    intent = intent.with("sizes", json!(sizes));
                }
                if let Some(product_type) = product_type {
                    intent = intent.with("productType", json!(product_type));
                }
                if let Some(price) = price {
                    intent = intent.with("price", price);
                }
                if let Some(available) = available {
                    intent = intent.with("available", json!(available));
                }
                intent
            })
    }

    pub fn arb_extraction() -> impl Strategy<Value = KeywordExtraction> {
        (arb_intent(), prop::collection::vec("[a-z]{3,8}", 0..4), -1.0f64..2.0).prop_map(
            |(filters, keywords, confidence)| KeywordExtraction {
                clean_query: keywords.join(" "),
                keywords,
                filters,
                confidence,
                reasoning: String::new(),
            },
        )
    }

    pub fn arb_batch_item() -> impl Strategy<Value = BatchItem> {
        (1u32..10_000, "[a-z]{2,8}( [a-z]{2,8}){0,4}", "[a-z]{0,6}")
            .prop_map(|(id, text, context)| BatchItem::new(id.to_string(), text).with_context(context))
    }

    /// Sheet rows 2.. with non-empty input text.
    pub fn arb_sheet_rows() -> impl Strategy<Value = Vec<SheetRow>> {
        prop::collection::vec("[a-z]{2,8}( [a-z]{2,8}){0,3}", 1..12).prop_map(|texts| {
            texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| SheetRow::new(i + 2, (i + 1).to_string(), text))
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Canned payloads and configuration for pipeline tests.

    use super::*;
    use serde_json::{json, Value};

    /// Valid configuration with no inter-item delay.
    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.api.base_url = "mock://catalog".to_string();
        config.processing.delay_between_requests_secs = 0.0;
        config
    }

    pub fn blue_shirts_intent() -> SemanticFilterIntent {
        SemanticFilterIntent::new()
            .with("colors", json!(["blue"]))
            .with("productType", json!("shirts"))
    }

    pub fn blue_shirts_extraction() -> KeywordExtraction {
        KeywordExtraction {
            keywords: vec!["blue".to_string(), "shirts".to_string()],
            filters: blue_shirts_intent(),
            clean_query: "blue shirts".to_string(),
            confidence: 0.9,
            reasoning: "color and product type".to_string(),
        }
    }

    /// Descriptor that supports product type and a Color variant.
    pub fn shirts_capabilities() -> CapabilityDescriptor {
        CapabilityDescriptor::empty()
            .with_product_type(true)
            .with_variant("Color", true)
    }

    /// Discovery answer advertising product type and color.
    pub fn discovery_payload() -> Value {
        json!({"available_filters": [
            {"label": "Type", "input_options": [{"productType": "Shirts"}]},
            {"label": "Color", "input_options": [{"variantOption": {"name": "color", "value": "Blue"}}]}
        ]})
    }

    /// One in-stock shirt.
    pub fn products_payload() -> Value {
        json!({"products": [
            {"product_id": "p1", "title": "Blue Oxford", "product_type": "Shirts",
             "variants": [{"size": "M", "available": true}]}
        ]})
    }

    /// Product with an oversized fit and dry-clean care notes in HTML.
    pub fn oversized_tee() -> Value {
        json!({
            "product_id": "gid://shopify/Product/1",
            "title": "Boxy Tee",
            "variants": [{"size": "M", "available": true}],
            "description": "<p>Oversized fit, dry clean only</p>"
        })
    }

    /// `payload` wrapped as a JSON-RPC result with embedded text content.
    pub fn jsonrpc_wrapped(payload: &Value) -> Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": {"content": [{
            "type": "text",
            "text": payload.to_string()
        }]}})
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over shopsift results.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &ShopsiftResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &ShopsiftResult<T>) {
        match result {
            Err(ShopsiftError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &ShopsiftResult<T>) {
        match result {
            Err(ShopsiftError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert a config passes validation.
    #[track_caller]
    pub fn assert_config_valid(config: &AppConfig) {
        if let Err(e) = config.validate() {
            panic!("Expected valid config, got: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_config_fixture_is_valid() {
        let config = fixtures::test_config();
        assertions::assert_config_valid(&config);
        assert!(config.processing.delay().is_zero());
    }

    #[test]
    fn test_shirts_fixtures_agree() {
        let capabilities = fixtures::shirts_capabilities();
        assert!(capabilities.supports.product_type);
        assert!(capabilities.supports_variant("Color"));
        assert_eq!(fixtures::blue_shirts_extraction().filters, fixtures::blue_shirts_intent());
    }

    #[test]
    fn test_jsonrpc_wrapping_embeds_text() {
        let wrapped = fixtures::jsonrpc_wrapped(&fixtures::products_payload());
        let text = wrapped["result"]["content"][0]["text"].as_str().unwrap();
        let inner: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(inner, fixtures::products_payload());
    }

    #[test]
    fn test_assertion_storage_error() {
        let result: ShopsiftResult<()> = Err(ShopsiftError::Storage(StorageError::LockPoisoned));
        assertions::assert_storage_error(&result);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_rows_start_at_two(rows in generators::arb_sheet_rows()) {
            prop_assert_eq!(rows[0].row, 2);
            prop_assert!(rows.iter().all(|r| !r.input_text.trim().is_empty()));
        }

        #[test]
        fn prop_generated_intent_categories_are_known(intent in generators::arb_intent()) {
            for (category, _) in intent.iter() {
                prop_assert!(["colors", "sizes", "productType", "price", "available"].contains(&category.as_str()));
            }
        }
    }
}
