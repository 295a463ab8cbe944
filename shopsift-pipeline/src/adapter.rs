//! Semantic intent to endpoint-native filter clauses.
//!
//! Each category is gated by its own capability flag. A category the
//! descriptor does not advertise produces no clause and no error; reporting
//! it is the validator's job.

use serde_json::Value;
use shopsift_core::{
    title_case, CapabilityDescriptor, MappedFilterClause, PriceDefaults, PriceIntent,
    SemanticFilterIntent, CATEGORY_COLORS, CATEGORY_MATERIALS, CATEGORY_SALES, CATEGORY_SIZES,
    CATEGORY_VARIANT_OPTION,
};

pub const COLOR_VARIANT: &str = "Color";
pub const SIZE_VARIANT: &str = "Size";
pub const MATERIAL_METAFIELD_KEY: &str = "material";

/// Maps an intent onto the filters a catalog advertises.
#[derive(Debug, Clone, Default)]
pub struct FilterAdapter {
    price_defaults: PriceDefaults,
}

impl FilterAdapter {
    pub fn new(price_defaults: PriceDefaults) -> Self {
        Self { price_defaults }
    }

    pub fn price_defaults(&self) -> PriceDefaults {
        self.price_defaults
    }

    /// Clauses in category order: product type, colors, sizes, materials,
    /// price, sale tags, availability.
    pub fn adapt(
        &self,
        intent: &SemanticFilterIntent,
        capabilities: &CapabilityDescriptor,
    ) -> Vec<MappedFilterClause> {
        let supports = &capabilities.supports;
        let mut clauses = Vec::new();

        if supports.product_type {
            if let Some(product_type) = intent.product_type() {
                clauses.push(MappedFilterClause::ProductType(title_case(product_type)));
            }
        }

        if capabilities.supports_variant(COLOR_VARIANT) {
            clauses.extend(
                intent
                    .string_list(CATEGORY_COLORS)
                    .iter()
                    .map(|color| MappedFilterClause::variant(COLOR_VARIANT, title_case(color))),
            );
        }

        if capabilities.supports_variant(SIZE_VARIANT) {
            clauses.extend(
                intent
                    .string_list(CATEGORY_SIZES)
                    .iter()
                    .map(|size| MappedFilterClause::variant(SIZE_VARIANT, size.to_uppercase())),
            );
        }

        if let Some(metafield) = capabilities.metafield_for_key(MATERIAL_METAFIELD_KEY) {
            clauses.extend(intent.string_list(CATEGORY_MATERIALS).into_iter().map(|material| {
                MappedFilterClause::metafield(&metafield.namespace, &metafield.key, material)
            }));
        }

        if supports.price {
            if let Some(clause) = intent
                .price()
                .and_then(|price| price_clause(&price, self.price_defaults))
            {
                clauses.push(clause);
            }
        }

        if supports.tag {
            clauses.extend(
                intent
                    .string_list(CATEGORY_SALES)
                    .into_iter()
                    .map(MappedFilterClause::Tag),
            );
        }

        if supports.available {
            if let Some(available) = intent.availability() {
                clauses.push(MappedFilterClause::Available(available));
            }
        }

        tracing::debug!(
            categories = intent.len(),
            clauses = clauses.len(),
            "Adapted filter intent"
        );
        clauses
    }
}

/// Price clause for an intent, or `None` when no bound was given or a given
/// bound is not numeric. A missing side takes its default; inverted bounds
/// are swapped.
pub fn price_clause(price: &PriceIntent, defaults: PriceDefaults) -> Option<MappedFilterClause> {
    if price.is_unbounded() {
        return None;
    }
    let min = match &price.min {
        Some(bound) => bound.as_number()?,
        None => defaults.min,
    };
    let max = match &price.max {
        Some(bound) => bound.as_number()?,
        None => defaults.max,
    };
    Some(MappedFilterClause::price(min, max))
}

/// Capability-blind conversion used by the direct search path.
///
/// Price and product type are converted as-is; a `variantOption` object with
/// a name and value is passed through.
pub fn naive_filters(intent: &SemanticFilterIntent, defaults: PriceDefaults) -> Vec<MappedFilterClause> {
    let mut clauses = Vec::new();
    if let Some(clause) = intent.price().and_then(|price| price_clause(&price, defaults)) {
        clauses.push(clause);
    }
    if let Some(product_type) = intent.product_type() {
        clauses.push(MappedFilterClause::ProductType(product_type.to_string()));
    }
    if let Some(Value::Object(option)) = intent.get(CATEGORY_VARIANT_OPTION) {
        let name = option.get("name").and_then(Value::as_str);
        let value = option.get("value").and_then(Value::as_str);
        if let (Some(name), Some(value)) = (name, value) {
            clauses.push(MappedFilterClause::variant(name, value));
        }
    }
    clauses
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use shopsift_core::PriceRange;

    fn price_of(clauses: &[MappedFilterClause]) -> Option<PriceRange> {
        clauses.iter().find_map(|clause| match clause {
            MappedFilterClause::Price(range) => Some(*range),
            _ => None,
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_min_only_fills_default_max(min in 0u32..1_000_000) {
            let intent = SemanticFilterIntent::new().with("price", json!({"min": min}));
            let capabilities = CapabilityDescriptor::empty().with_price(true);
            let range = price_of(&FilterAdapter::default().adapt(&intent, &capabilities));
            prop_assert_eq!(range, Some(PriceRange { min: min as f64, max: 999999.0 }));
        }

        #[test]
        fn prop_max_only_fills_default_min(max in 0u32..1_000_000) {
            let intent = SemanticFilterIntent::new().with("priceRange", json!({"max": max}));
            let capabilities = CapabilityDescriptor::empty().with_price(true);
            let range = price_of(&FilterAdapter::default().adapt(&intent, &capabilities));
            prop_assert_eq!(range, Some(PriceRange { min: 0.0, max: max as f64 }));
        }

        #[test]
        fn prop_bounds_always_ordered(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
            let intent = SemanticFilterIntent::new().with("price", json!({"min": a, "max": b}));
            let capabilities = CapabilityDescriptor::empty().with_price(true);
            let range = price_of(&FilterAdapter::default().adapt(&intent, &capabilities));
            let range = range.expect("price clause");
            prop_assert!(range.min <= range.max);
            prop_assert_eq!(range.min, a.min(b));
            prop_assert_eq!(range.max, a.max(b));
        }

        #[test]
        fn prop_no_color_clause_when_unsupported(
            colors in proptest::collection::vec("[a-z]{1,10}", 0..5),
            advertise_false in any::<bool>(),
            product_type in any::<bool>(),
        ) {
            let intent = SemanticFilterIntent::new().with("colors", json!(colors));
            let mut capabilities = full_capabilities_without_color();
            capabilities.supports.product_type = product_type;
            if advertise_false {
                capabilities = capabilities.with_variant("Color", false);
            }
            let clauses = FilterAdapter::default().adapt(&intent, &capabilities);
            let has_color = clauses.iter().any(|clause| matches!(
                clause,
                MappedFilterClause::VariantOption(option) if option.name == "Color"
            ));
            prop_assert!(!has_color);
        }
    }

    fn full_capabilities_without_color() -> CapabilityDescriptor {
        CapabilityDescriptor::empty()
            .with_price(true)
            .with_tag(true)
            .with_available(true)
            .with_variant("Size", true)
    }
}
