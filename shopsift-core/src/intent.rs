//! Semantic filter intent and keyword extraction output.
//!
//! The intent is produced by the extraction collaborator and never mutated
//! afterwards. Accessors are lenient: a category holding the wrong JSON shape
//! reads as absent rather than failing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// CATEGORY KEYS
// ============================================================================

pub const CATEGORY_COLORS: &str = "colors";
pub const CATEGORY_SIZES: &str = "sizes";
pub const CATEGORY_MATERIALS: &str = "materials";
pub const CATEGORY_SALES: &str = "sales";
pub const CATEGORY_PRODUCT_TYPE: &str = "productType";
pub const CATEGORY_PRODUCT_TYPE_SNAKE: &str = "product_type";
pub const CATEGORY_PRICE: &str = "price";
pub const CATEGORY_PRICE_RANGE: &str = "priceRange";
pub const CATEGORY_AVAILABLE: &str = "available";
pub const CATEGORY_AVAILABILITY: &str = "availability";
pub const CATEGORY_VARIANT_OPTION: &str = "variantOption";

// ============================================================================
// SEMANTIC FILTER INTENT
// ============================================================================

/// Category-keyed filter intent, e.g. `{"colors": ["blue"], "productType": "shirts"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemanticFilterIntent(Map<String, Value>);

impl SemanticFilterIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, category: impl Into<String>, value: Value) -> Self {
        self.0.insert(category.into(), value);
        self
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.0.get(category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate categories and their raw values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Values of a list category. A bare string counts as a one-element list;
    /// non-string and blank elements are skipped.
    pub fn string_list(&self, category: &str) -> Vec<String> {
        match self.0.get(category) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }

    /// Product type from `productType`, falling back to `product_type`.
    pub fn product_type(&self) -> Option<&str> {
        [CATEGORY_PRODUCT_TYPE, CATEGORY_PRODUCT_TYPE_SNAKE]
            .iter()
            .filter_map(|key| self.0.get(*key))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// Price intent from `price`, falling back to `priceRange`.
    pub fn price(&self) -> Option<PriceIntent> {
        [CATEGORY_PRICE, CATEGORY_PRICE_RANGE]
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(|value| match value {
                Value::Object(obj) => Some(PriceIntent {
                    min: obj.get("min").filter(|v| !v.is_null()).map(PriceBound::from_value),
                    max: obj.get("max").filter(|v| !v.is_null()).map(PriceBound::from_value),
                }),
                _ => None,
            })
    }

    /// Availability flag, only when explicitly present and not null.
    pub fn availability(&self) -> Option<bool> {
        [CATEGORY_AVAILABLE, CATEGORY_AVAILABILITY]
            .iter()
            .filter_map(|key| self.0.get(*key))
            .find_map(Value::as_bool)
    }
}

impl From<Map<String, Value>> for SemanticFilterIntent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// PRICE INTENT
// ============================================================================

/// One side of a requested price range, as the collaborator sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceBound {
    Number(f64),
    /// Present but not interpretable as a number.
    NonNumeric(Value),
}

impl PriceBound {
    /// Numbers and numeric strings are accepted; everything else is kept as
    /// non-numeric so the caller can decide to drop it.
    pub fn from_value(value: &Value) -> Self {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => PriceBound::Number(n),
            _ => PriceBound::NonNumeric(value.clone()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PriceBound::Number(n) => Some(*n),
            PriceBound::NonNumeric(_) => None,
        }
    }
}

/// Requested `{min?, max?}` price pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceIntent {
    pub min: Option<PriceBound>,
    pub max: Option<PriceBound>,
}

impl PriceIntent {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

// ============================================================================
// KEYWORD EXTRACTION
// ============================================================================

/// Output of the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordExtraction {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub filters: SemanticFilterIntent,
    #[serde(default, alias = "cleanQuery")]
    pub clean_query: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

fn default_confidence() -> f64 {
    0.8
}

/// Confidence assigned when extraction fell back to the raw input.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

impl KeywordExtraction {
    /// Deterministic result used when the collaborator fails: the original
    /// text becomes the clean query.
    pub fn fallback(text: &str, reason: &str) -> Self {
        Self {
            keywords: Vec::new(),
            filters: SemanticFilterIntent::new(),
            clean_query: text.to_string(),
            confidence: FALLBACK_CONFIDENCE,
            reasoning: format!("fallback to original query due to {}", reason),
        }
    }

    /// Clamp confidence into `[0, 1]`; NaN becomes the fallback confidence.
    pub fn normalized(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            FALLBACK_CONFIDENCE
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Non-blank clean query, if any.
    pub fn clean_query(&self) -> Option<&str> {
        let trimmed = self.clean_query.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
