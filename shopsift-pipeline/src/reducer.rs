//! Response reduction: verbose search payloads to compact typed products.
//!
//! Products are located with the same ordered extractors the normalizer
//! uses. Each record is read defensively; a record that cannot be read is
//! skipped and noted in the response errors, never fatal.

use crate::extract::{locate, locate_array};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use shopsift_core::{
    FilteredProduct, FilteredResponse, ProcessingMetrics, ReducerConfig, ResponseStatus, Size,
    DEFAULT_CURRENCY,
};
use std::collections::BTreeSet;
use std::time::Instant;

pub const PRODUCTS_KEY: &str = "products";

// ============================================================================
// PATTERNS
// ============================================================================

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid HTML tag regex"));

static FIT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)oversized", "Oversized"),
        (r"(?i)true[- ]?to[- ]?size", "True-to-size"),
        (r"(?i)regular fit", "Regular"),
        (r"(?i)slim fit", "Slim"),
        (r"(?i)relaxed fit", "Relaxed"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("valid fit regex"), label))
    .collect()
});

static CARE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)dry\s*clean\s*only", "Dry clean only"),
        (r"(?i)machine\s*w(?:ash|ashing)\s*cold", "Machine wash cold"),
        (r"(?i)do\s*not\s*tumble\s*dry", "Do not tumble dry"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("valid care regex"), label))
    .collect()
});

/// First label whose pattern matches any of `texts`, checked pattern by
/// pattern.
fn first_match(patterns: &[(Regex, &'static str)], texts: &[&str]) -> Option<String> {
    patterns
        .iter()
        .find(|(pattern, _)| texts.iter().any(|text| pattern.is_match(text)))
        .map(|(_, label)| label.to_string())
}

// ============================================================================
// FIELD READERS
// ============================================================================

fn str_field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Id as a string; numeric ids are accepted.
fn id_field(record: &Value) -> Option<String> {
    ["product_id", "id"].iter().find_map(|key| match record.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// `(min, max)` from flat fields, falling back to a `price_range` object.
/// Missing prices stay absent rather than becoming zero.
fn price_bounds(record: &Value) -> (Option<f64>, Option<f64>) {
    let range = record
        .get("price_range")
        .or_else(|| record.get("priceRange"))
        .filter(|v| v.is_object());
    let min = number(record.get("price_min")).or_else(|| range.and_then(|r| number(r.get("min"))));
    let max = number(record.get("price_max")).or_else(|| range.and_then(|r| number(r.get("max"))));
    (min, max)
}

fn currency(record: &Value) -> String {
    str_field(record, &["currency"])
        .map(str::to_string)
        .or_else(|| {
            record
                .get("price_range")
                .or_else(|| record.get("priceRange"))
                .and_then(|r| str_field(r, &["currency"]))
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// Recognized sizes, ordered by the size enum. Unknown strings drop out.
fn variant_sizes(variants: &[Value]) -> Vec<Size> {
    let sizes: BTreeSet<Size> = variants
        .iter()
        .filter_map(|variant| {
            ["size", "option1", "title"]
                .iter()
                .filter_map(|key| variant.get(*key).and_then(Value::as_str))
                .find_map(Size::parse)
        })
        .collect();
    sizes.into_iter().collect()
}

fn variant_available(variant: &Value) -> bool {
    ["available", "available_for_sale", "availableForSale"]
        .iter()
        .any(|key| variant.get(*key).and_then(Value::as_bool) == Some(true))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

// ============================================================================
// REDUCER
// ============================================================================

/// Why a record could not be reduced.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SkipReason {
    NotAnObject,
    VariantsNotList,
    NoIdentity,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAnObject => write!(f, "record is not an object"),
            SkipReason::VariantsNotList => write!(f, "variants is not a list"),
            SkipReason::NoIdentity => write!(f, "record has neither id nor title"),
        }
    }
}

/// Reduces raw search payloads into `FilteredResponse`s.
#[derive(Debug, Clone, Default)]
pub struct ResponseReducer {
    config: ReducerConfig,
}

impl ResponseReducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Reduce one raw payload. Status is `empty` with no records, `error`
    /// when every record was skipped, `partial` when some were, otherwise
    /// `success`. Metrics are always attached.
    pub fn reduce(&self, raw: &Value) -> FilteredResponse {
        let started = Instant::now();
        let records = locate_array(raw, PRODUCTS_KEY).unwrap_or_default();

        let mut products = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match self.reduce_product(record) {
                Ok(product) => products.push(product),
                Err(reason) => {
                    tracing::warn!(index, reason = %reason, "Skipping malformed product record");
                    skipped.push(format!("Skipped product {}: {}", index, reason));
                }
            }
        }

        let status = match (records.is_empty(), products.is_empty(), skipped.is_empty()) {
            (true, _, _) => ResponseStatus::Empty,
            (false, true, _) => ResponseStatus::Error,
            (false, false, false) => ResponseStatus::Partial,
            (false, false, true) => ResponseStatus::Success,
        };

        let mut response = FilteredResponse::new(status, products);
        for message in skipped {
            response.add_error(message);
        }
        response.pagination_info = locate(raw, PRODUCTS_KEY).and_then(|located| {
            located
                .get("pagination_info")
                .or_else(|| located.get("pagination"))
                .filter(|v| !v.is_null())
                .cloned()
        });

        let original_size = serialized_len(raw);
        let filtered_size = serialized_len(&response);
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            (original_size as f64 - filtered_size as f64) / original_size as f64 * 100.0
        };

        response.processing_metrics = Some(ProcessingMetrics {
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            products_processed: records.len(),
            products_filtered: response.products_count,
            target_reduction: self.config.target_reduction,
            original_size,
            filtered_size,
            reduction_percent,
        });

        tracing::debug!(
            status = ?response.status,
            products = response.products_count,
            original_size,
            filtered_size,
            reduction_percent,
            "Reduced search response"
        );
        response
    }

    fn reduce_product(&self, record: &Value) -> Result<FilteredProduct, SkipReason> {
        if !record.is_object() {
            return Err(SkipReason::NotAnObject);
        }
        let variants: &[Value] = match record.get("variants") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(_) => return Err(SkipReason::VariantsNotList),
        };

        let id = id_field(record);
        let title = str_field(record, &["title", "name"]).map(str::to_string);
        if id.is_none() && title.is_none() {
            return Err(SkipReason::NoIdentity);
        }

        let (price_min, price_max) = price_bounds(record);
        let description = str_field(record, &["description"]);
        let body_html = str_field(record, &["body_html"]);
        let title_text = title.as_deref().unwrap_or_default();
        let care_text = str_field(record, &["care_instructions"]);

        let fit_info = first_match(
            &FIT_PATTERNS,
            &[description.unwrap_or_default(), body_html.unwrap_or_default(), title_text],
        );
        let care_info = first_match(
            &CARE_PATTERNS,
            &[
                description.unwrap_or_default(),
                body_html.unwrap_or_default(),
                care_text.unwrap_or_default(),
            ],
        );

        Ok(FilteredProduct {
            id: id.unwrap_or_default(),
            title: title.unwrap_or_default(),
            product_type: str_field(record, &["product_type", "productType"]).map(str::to_string),
            price_min,
            price_max,
            currency: currency(record),
            sizes: variant_sizes(variants),
            available: (!variants.is_empty()).then(|| variants.iter().any(variant_available)),
            variants_count: variants.len(),
            tags: self.tags(record.get("tags")),
            fit_info,
            care_info,
            description_summary: description.or(body_html).and_then(|d| self.summarize(d)),
        })
    }

    /// List tags keep the first `max_tags`; a tag string is cut to
    /// `max_tag_chars`.
    fn tags(&self, tags: Option<&Value>) -> Option<String> {
        let joined = match tags? {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .take(self.config.max_tags)
                .collect::<Vec<_>>()
                .join(", "),
            Value::String(s) => truncate_chars(s.trim(), self.config.max_tag_chars),
            _ => return None,
        };
        (!joined.is_empty()).then_some(joined)
    }

    /// Strip tags, trim, and cut to the description limit with `...`.
    fn summarize(&self, text: &str) -> Option<String> {
        let stripped = HTML_TAG.replace_all(text, "");
        let clean = stripped.trim();
        if clean.is_empty() {
            return None;
        }
        let limit = self.config.description_limit;
        if clean.chars().count() > limit {
            Some(format!("{}...", truncate_chars(clean, limit)))
        } else {
            Some(clean.to_string())
        }
    }
}

/// Compact serialized length in bytes; zero if serialization fails.
fn serialized_len<T: serde::Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reducer() -> ResponseReducer {
        ResponseReducer::default()
    }

    fn wrapped(products: Value) -> Value {
        json!({"jsonrpc": "2.0", "result": {"content": [{
            "type": "text",
            "text": json!({"products": products, "pagination": {"has_next_page": false}}).to_string()
        }]}})
    }

    #[test]
    fn test_oversized_dry_clean_record() {
        let raw = json!({"products": [{
            "product_id": "gid://shopify/Product/1",
            "title": "Boxy Tee",
            "variants": [{"size": "M", "available": true}],
            "description": "<p>Oversized fit, dry clean only</p>"
        }]});
        let response = reducer().reduce(&raw);
        assert_eq!(response.status, ResponseStatus::Success);
        let product = &response.products[0];
        assert_eq!(product.sizes, vec![Size::M]);
        assert_eq!(product.available, Some(true));
        assert_eq!(product.fit_info.as_deref(), Some("Oversized"));
        assert_eq!(product.care_info.as_deref(), Some("Dry clean only"));
        assert_eq!(
            product.description_summary.as_deref(),
            Some("Oversized fit, dry clean only")
        );
        assert_eq!(product.variants_count, 1);
        assert_eq!(product.currency, "USD");
    }

    #[test]
    fn test_empty_products_is_empty_status() {
        for raw in [json!({"products": []}), json!({}), wrapped(json!([]))] {
            let response = reducer().reduce(&raw);
            assert_eq!(response.status, ResponseStatus::Empty);
            assert_eq!(response.products_count, 0);
            assert!(response.processing_metrics.is_some());
        }
    }

    #[test]
    fn test_nested_envelope_and_pagination() {
        let raw = wrapped(json!([{"id": "1", "title": "A"}, {"id": "2", "title": "B"}]));
        let response = reducer().reduce(&raw);
        assert_eq!(response.products_count, 2);
        assert_eq!(response.pagination_info, Some(json!({"has_next_page": false})));
    }

    #[test]
    fn test_sizes_follow_enum_order_and_drop_unknown() {
        let raw = json!({"products": [{
            "id": "1",
            "title": "Tee",
            "variants": [
                {"size": "XL", "available": false},
                {"title": "s"},
                {"option1": "One Size"},
                {"size": "xxs"},
                {"size": "XL"}
            ]
        }]});
        let product = &reducer().reduce(&raw).products[0];
        assert_eq!(product.sizes, vec![Size::Xxs, Size::S, Size::Xl]);
        assert_eq!(product.available, Some(false));
        assert_eq!(product.variants_count, 5);
    }

    #[test]
    fn test_no_variants_means_unknown_availability() {
        let raw = json!({"products": [{"id": "1", "title": "Tee"}]});
        let product = &reducer().reduce(&raw).products[0];
        assert_eq!(product.available, None);
        assert!(product.sizes.is_empty());
    }

    #[test]
    fn test_missing_price_is_absent_not_zero() {
        let raw = json!({"products": [
            {"id": "1", "title": "A"},
            {"id": "2", "title": "B", "price_range": {"min": "12.50", "max": 30, "currency": "EUR"}},
            {"id": "3", "title": "C", "price_min": 5, "price_max": "n/a"}
        ]});
        let products = reducer().reduce(&raw).products;
        assert_eq!((products[0].price_min, products[0].price_max), (None, None));
        assert_eq!((products[1].price_min, products[1].price_max), (Some(12.5), Some(30.0)));
        assert_eq!(products[1].currency, "EUR");
        assert_eq!((products[2].price_min, products[2].price_max), (Some(5.0), None));
    }

    #[test]
    fn test_tags_capped() {
        let raw = json!({"products": [
            {"id": "1", "title": "A", "tags": ["a", "b", "c", "d", "e", "f", "g"]},
            {"id": "2", "title": "B", "tags": "x".repeat(150)},
            {"id": "3", "title": "C", "tags": []}
        ]});
        let products = reducer().reduce(&raw).products;
        assert_eq!(products[0].tags.as_deref(), Some("a, b, c, d, e"));
        assert_eq!(products[1].tags.as_ref().map(|t| t.len()), Some(100));
        assert_eq!(products[2].tags, None);
    }

    #[test]
    fn test_fit_and_care_first_match_wins() {
        let raw = json!({"products": [{
            "id": "1",
            "title": "Slim Fit Chino",
            "body_html": "Machine washing cold recommended. Do not tumble dry. True to size.",
        }]});
        let product = &reducer().reduce(&raw).products[0];
        assert_eq!(product.fit_info.as_deref(), Some("True-to-size"));
        assert_eq!(product.care_info.as_deref(), Some("Machine wash cold"));
    }

    #[test]
    fn test_care_instructions_field_scanned() {
        let raw = json!({"products": [{"id": "1", "title": "Coat", "care_instructions": "DRY CLEAN ONLY"}]});
        let product = &reducer().reduce(&raw).products[0];
        assert_eq!(product.care_info.as_deref(), Some("Dry clean only"));
        assert_eq!(product.description_summary, None);
    }

    #[test]
    fn test_description_truncated_with_ellipsis() {
        let long = format!("<div>{}</div>", "é".repeat(250));
        let raw = json!({"products": [{"id": "1", "title": "A", "description": long}]});
        let summary = reducer().reduce(&raw).products[0].description_summary.clone().unwrap();
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_malformed_records_skipped() {
        let raw = json!({"products": [
            "not an object",
            {"id": "1", "title": "Good"},
            {"id": "2", "title": "Bad variants", "variants": "oops"},
            {"vendor": "no identity"}
        ]});
        let response = reducer().reduce(&raw);
        assert_eq!(response.status, ResponseStatus::Partial);
        assert_eq!(response.products_count, 1);
        assert_eq!(response.errors.len(), 3);
        assert!(response.errors[0].message.contains("not an object"));
        let metrics = response.processing_metrics.unwrap();
        assert_eq!(metrics.products_processed, 4);
        assert_eq!(metrics.products_filtered, 1);
    }

    #[test]
    fn test_all_malformed_is_error() {
        let response = reducer().reduce(&json!({"products": [1, 2]}));
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.products_count, 0);
    }

    #[test]
    fn test_numeric_id_and_name_fallback() {
        let raw = json!({"products": [{"id": 42, "name": "Widget", "productType": "Gadgets"}]});
        let product = &reducer().reduce(&raw).products[0];
        assert_eq!(product.id, "42");
        assert_eq!(product.title, "Widget");
        assert_eq!(product.product_type.as_deref(), Some("Gadgets"));
    }

    #[test]
    fn test_reduction_metric() {
        let verbose = json!({"products": [{
            "id": "1",
            "title": "Tee",
            "vendor": "x".repeat(2000),
            "images": [{"url": "y".repeat(2000)}]
        }]});
        let metrics = reducer().reduce(&verbose).processing_metrics.unwrap();
        assert!(metrics.original_size > metrics.filtered_size);
        assert!(metrics.reduction_percent > 75.0);
        assert_eq!(metrics.target_reduction, 75.0);
    }
}
