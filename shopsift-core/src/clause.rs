//! Endpoint-native filter clauses.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};

/// Closed price range sent to the endpoint. `min <= max` once built by the
/// adapter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Build a range, swapping the bounds when they arrive inverted.
    pub fn ordered(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }
}

impl Serialize for PriceRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PriceRange", 2)?;
        state.serialize_field("min", &price_number(self.min))?;
        state.serialize_field("max", &price_number(self.max))?;
        state.end()
    }
}

/// Integral prices serialize as JSON integers (`300`, not `300.0`).
pub fn price_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Variant option name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOptionValue {
    pub name: String,
    pub value: String,
}

/// Metafield namespace/key/value triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafieldValue {
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// One filter entry in the endpoint's vocabulary. Serializes as a single-key
/// object, e.g. `{"productType": "Shirts"}` or
/// `{"variantOption": {"name": "Color", "value": "Blue"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappedFilterClause {
    ProductType(String),
    VariantOption(VariantOptionValue),
    ProductMetafield(MetafieldValue),
    Price(PriceRange),
    Tag(String),
    Available(bool),
}

impl MappedFilterClause {
    pub fn variant(name: impl Into<String>, value: impl Into<String>) -> Self {
        MappedFilterClause::VariantOption(VariantOptionValue {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn metafield(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        MappedFilterClause::ProductMetafield(MetafieldValue {
            namespace: namespace.into(),
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn price(min: f64, max: f64) -> Self {
        MappedFilterClause::Price(PriceRange::ordered(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clause_wire_shapes() {
        let clauses = vec![
            MappedFilterClause::ProductType("Shirts".to_string()),
            MappedFilterClause::variant("Color", "Blue"),
            MappedFilterClause::metafield("custom", "material", "cotton"),
            MappedFilterClause::price(300.0, 999999.0),
            MappedFilterClause::Tag("sale".to_string()),
            MappedFilterClause::Available(true),
        ];
        let value = serde_json::to_value(&clauses).unwrap();
        assert_eq!(
            value,
            json!([
                {"productType": "Shirts"},
                {"variantOption": {"name": "Color", "value": "Blue"}},
                {"productMetafield": {"namespace": "custom", "key": "material", "value": "cotton"}},
                {"price": {"min": 300, "max": 999999}},
                {"tag": "sale"},
                {"available": true}
            ])
        );
    }

    #[test]
    fn test_fractional_price_kept_as_float() {
        let value = serde_json::to_value(MappedFilterClause::price(19.99, 5.5)).unwrap();
        assert_eq!(value, json!({"price": {"min": 5.5, "max": 19.99}}));
    }

    #[test]
    fn test_variant_clause_deserializes() {
        let clause: MappedFilterClause =
            serde_json::from_value(json!({"variantOption": {"name": "Size", "value": "M"}})).unwrap();
        assert_eq!(clause, MappedFilterClause::variant("Size", "M"));
    }
}
