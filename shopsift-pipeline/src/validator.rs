//! Filter validation against a capability descriptor or a list of names.

use serde_json::{Map, Value};
use shopsift_core::{CapabilityDescriptor, SemanticFilterIntent, ValidationResult};
use std::collections::BTreeMap;

use crate::adapter::{COLOR_VARIANT, MATERIAL_METAFIELD_KEY, SIZE_VARIANT};

/// Filter names most catalogs advertise, used when no discovery ran.
pub const COMMON_API_FILTERS: &[&str] = &["Price", "Availability", "Product Type", "Brand"];

/// How each known category is folded into a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMapping {
    TextSearch,
    Category,
    PriceRange,
}

/// Categories with a known query mapping. Membership counts as supported
/// when validating against names.
pub const SEMANTIC_TO_QUERY_MAPPING: &[(&str, QueryMapping)] = &[
    ("colors", QueryMapping::TextSearch),
    ("brands", QueryMapping::TextSearch),
    ("product_type", QueryMapping::Category),
    ("productType", QueryMapping::Category),
    ("price", QueryMapping::PriceRange),
    ("materials", QueryMapping::TextSearch),
    ("sizes", QueryMapping::TextSearch),
    ("sales", QueryMapping::TextSearch),
];

const SUGGESTIONS: &[(&str, &str)] = &[
    ("colors", "Use text search with color terms"),
    ("materials", "Use text search with material names"),
    ("styles", "Use text search with style terms"),
    ("occasions", "Use text search with occasion terms"),
];

pub fn query_mapping(category: &str) -> Option<QueryMapping> {
    SEMANTIC_TO_QUERY_MAPPING
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, mapping)| *mapping)
}

/// Suggested workaround for an unsupported category.
pub fn suggestion_for(category: &str) -> Option<&'static str> {
    let lower = category.to_lowercase();
    SUGGESTIONS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, text)| *text)
}

/// Either side contains the other, ignoring case.
fn fuzzy_match(category: &str, names: &[String]) -> bool {
    let category = category.to_lowercase();
    names.iter().any(|name| {
        let name = name.to_lowercase();
        !name.is_empty() && (name.contains(&category) || category.contains(&name))
    })
}

/// Classifies intent categories as supported or unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterValidator;

impl FilterValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate against plain filter names: a category is supported when it
    /// has a known query mapping or fuzzily matches one of `names`.
    pub fn validate_names(&self, intent: &SemanticFilterIntent, names: &[String]) -> ValidationResult {
        classify(intent, |category| {
            query_mapping(category).is_some() || fuzzy_match(category, names)
        })
    }

    /// Validate against a discovered descriptor. Categories with a native
    /// capability use its flag; anything else falls back to matching the
    /// descriptor's filter names.
    pub fn validate_capabilities(
        &self,
        intent: &SemanticFilterIntent,
        capabilities: &CapabilityDescriptor,
    ) -> ValidationResult {
        let names = capabilities.filter_names();
        let supports = &capabilities.supports;
        classify(intent, |category| match category {
            "colors" => capabilities.supports_variant(COLOR_VARIANT),
            "sizes" => capabilities.supports_variant(SIZE_VARIANT),
            "materials" => capabilities.metafield_for_key(MATERIAL_METAFIELD_KEY).is_some(),
            "productType" | "product_type" => supports.product_type,
            "price" | "priceRange" => supports.price,
            "sales" | "tags" => supports.tag,
            "available" | "availability" => supports.available,
            other => fuzzy_match(other, &names),
        })
    }
}

fn classify<F>(intent: &SemanticFilterIntent, is_supported: F) -> ValidationResult
where
    F: Fn(&str) -> bool,
{
    let mut supported = Map::new();
    let mut unsupported = Map::new();
    let mut suggestions = BTreeMap::new();
    let mut notes = Vec::new();

    for (category, value) in intent.iter() {
        if is_supported(category) {
            supported.insert(category.clone(), value.clone());
            notes.push(format!("{}: supported", category));
            continue;
        }
        unsupported.insert(category.clone(), value.clone());
        match suggestion_for(category) {
            Some(suggestion) => {
                suggestions.insert(category.clone(), suggestion.to_string());
                notes.push(format!("{}: unsupported, suggested: {}", category, suggestion));
            }
            None => notes.push(format!("{}: unsupported, no alternative", category)),
        }
    }

    let total = supported.len() + unsupported.len();
    ValidationResult {
        is_valid: unsupported.is_empty(),
        confidence_score: ValidationResult::confidence(supported.len(), total),
        supported_filters: supported,
        unsupported_filters: unsupported,
        suggested_alternatives: suggestions,
        notes,
    }
}

/// Keys of an unsupported map, in order, for notes.
pub(crate) fn category_list(filters: &Map<String, Value>) -> String {
    let keys: Vec<String> = filters.keys().map(|k| format!("'{}'", k)).collect();
    format!("[{}]", keys.join(", "))
}
