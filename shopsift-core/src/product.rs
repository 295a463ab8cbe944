//! Reduced product projection and response envelope.

use crate::{FilterSpec, TimestampedNote};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// SIZE ENUM
// ============================================================================

/// Apparel sizes in display order. Anything else is not a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    Xxxs,
    Xxs,
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    Xxxl,
    Xxxxl,
}

impl Size {
    pub const ALL: [Size; 10] = [
        Size::Xxxs,
        Size::Xxs,
        Size::Xs,
        Size::S,
        Size::M,
        Size::L,
        Size::Xl,
        Size::Xxl,
        Size::Xxxl,
        Size::Xxxxl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Xxxs => "XXXS",
            Size::Xxs => "XXS",
            Size::Xs => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
            Size::Xxxl => "XXXL",
            Size::Xxxxl => "XXXXL",
        }
    }

    /// Parse after trimming and upper-casing; unknown labels yield `None`.
    pub fn parse(raw: &str) -> Option<Size> {
        let normalized = raw.trim().to_uppercase();
        Size::ALL.iter().copied().find(|s| s.as_str() == normalized)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FILTERED PRODUCT
// ============================================================================

pub const DEFAULT_CURRENCY: &str = "USD";

/// Compact, fixed-shape projection of one catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredProduct {
    pub id: String,
    pub title: String,
    pub product_type: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: String,
    pub sizes: Vec<Size>,
    pub available: Option<bool>,
    pub variants_count: usize,
    pub tags: Option<String>,
    pub fit_info: Option<String>,
    pub care_info: Option<String>,
    pub description_summary: Option<String>,
}

// ============================================================================
// FILTERED RESPONSE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Empty,
    Error,
    Partial,
}

/// Timing and size metrics for one reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetrics {
    pub processing_time_ms: f64,
    pub products_processed: usize,
    pub products_filtered: usize,
    pub target_reduction: f64,
    pub original_size: usize,
    pub filtered_size: usize,
    pub reduction_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredResponse {
    pub status: ResponseStatus,
    pub products_count: usize,
    pub products: Vec<FilteredProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_spec: Option<FilterSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_metrics: Option<ProcessingMetrics>,
    pub errors: Vec<TimestampedNote>,
}

impl FilteredResponse {
    pub fn new(status: ResponseStatus, products: Vec<FilteredProduct>) -> Self {
        Self {
            status,
            products_count: products.len(),
            products,
            filter_spec: None,
            pagination_info: None,
            processing_metrics: None,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(TimestampedNote::now(error));
    }

    pub fn product_types(&self) -> impl Iterator<Item = Option<&str>> {
        self.products.iter().map(|p| p.product_type.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_parse_trims_and_uppercases() {
        assert_eq!(Size::parse(" xl "), Some(Size::Xl));
        assert_eq!(Size::parse("Medium"), None);
        assert_eq!(Size::parse("XXXXL"), Some(Size::Xxxxl));
    }

    #[test]
    fn test_size_order_matches_enum() {
        let mut sizes = vec![Size::Xl, Size::S, Size::Xxxs, Size::M];
        sizes.sort();
        assert_eq!(sizes, vec![Size::Xxxs, Size::S, Size::M, Size::Xl]);
    }

    #[test]
    fn test_size_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Size::Xxl).unwrap(), "\"XXL\"");
        let parsed: Size = serde_json::from_str("\"XS\"").unwrap();
        assert_eq!(parsed, Size::Xs);
    }

    #[test]
    fn test_empty_response_shape() {
        let response = FilteredResponse::new(ResponseStatus::Empty, vec![]);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "empty");
        assert_eq!(value["productsCount"], 0);
        assert!(value.get("filterSpec").is_none());
    }
}
