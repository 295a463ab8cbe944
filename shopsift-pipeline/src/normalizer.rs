//! Capability normalization: raw `available_filters` payload to descriptor.

use crate::extract::locate_array;
use serde_json::Value;
use shopsift_core::{title_case, CapabilityDescriptor, MetafieldRef};

pub const AVAILABLE_FILTERS_KEY: &str = "available_filters";

/// Turns whatever a discovery call returned into a `CapabilityDescriptor`.
///
/// Never fails. A payload without an `available_filters` array yields the
/// empty descriptor, and option shapes it does not recognize are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityNormalizer;

impl CapabilityNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, response: &Value) -> CapabilityDescriptor {
        let Some(entries) = locate_array(response, AVAILABLE_FILTERS_KEY) else {
            tracing::debug!("No available_filters in discovery payload");
            return CapabilityDescriptor::empty();
        };

        let mut descriptor = CapabilityDescriptor::empty();
        for entry in &entries {
            for option in input_options(entry) {
                apply_option(&mut descriptor, &option);
            }
        }
        descriptor.raw = entries;

        tracing::debug!(
            filters = descriptor.raw.len(),
            product_type = descriptor.supports.product_type,
            price = descriptor.supports.price,
            available = descriptor.supports.available,
            tag = descriptor.supports.tag,
            variants = descriptor.supports.variant_option.len(),
            metafields = descriptor.supports.product_metafield.len(),
            "Normalized capabilities"
        );
        descriptor
    }
}

/// Input options of one filter entry. Options may arrive JSON-encoded.
fn input_options(entry: &Value) -> Vec<Value> {
    let candidates = [
        entry.get("values").and_then(|v| v.get("input_options")),
        entry.get("input_options"),
        entry.get("inputOptions"),
    ];
    let Some(options) = candidates.into_iter().flatten().find_map(Value::as_array) else {
        return Vec::new();
    };
    options
        .iter()
        .filter_map(|option| match option {
            Value::String(encoded) => serde_json::from_str::<Value>(encoded).ok(),
            other => Some(other.clone()),
        })
        .filter(Value::is_object)
        .collect()
}

fn apply_option(descriptor: &mut CapabilityDescriptor, option: &Value) {
    let Some(object) = option.as_object() else {
        return;
    };
    for (key, value) in object {
        match key.as_str() {
            "productType" => descriptor.supports.product_type = true,
            "price" => descriptor.supports.price = true,
            "available" => descriptor.supports.available = true,
            "tag" => descriptor.supports.tag = true,
            "variantOption" => {
                if let Some(name) = value.get("name").and_then(Value::as_str) {
                    let name = title_case(name);
                    if !name.is_empty() {
                        descriptor.supports.variant_option.insert(name, true);
                    }
                }
            }
            "productMetafield" => {
                let namespace = value.get("namespace").and_then(Value::as_str);
                let key = value.get("key").and_then(Value::as_str);
                if let (Some(namespace), Some(key)) = (namespace, key) {
                    descriptor.add_metafield(MetafieldRef::new(namespace, key));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn discovery_payload(filters: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "result": {"content": [{
                "type": "text",
                "text": json!({"products": [], "available_filters": filters}).to_string()
            }]}
        })
    }

    #[test]
    fn test_full_capability_payload() {
        let payload = discovery_payload(json!([
            {"label": "Product type", "values": {"input_options": [{"productType": "Shirts"}]}},
            {"label": "Price", "values": {"input_options": [{"price": {"min": 0, "max": 100}}]}},
            {"label": "Availability", "values": {"input_options": [{"available": true}, {"available": false}]}},
            {"label": "Color", "values": {"input_options": [
                {"variantOption": {"name": "color", "value": "Blue"}},
                {"variantOption": {"name": "color", "value": "Red"}}
            ]}},
            {"label": "Size", "values": {"input_options": [{"variantOption": {"name": "Size", "value": "M"}}]}},
            {"label": "Material", "values": {"input_options": [
                {"productMetafield": {"namespace": "custom", "key": "material", "value": "cotton"}},
                {"productMetafield": {"namespace": "custom", "key": "material", "value": "wool"}}
            ]}},
            {"label": "Tag", "values": {"input_options": [{"tag": "sale"}]}}
        ]));

        let descriptor = CapabilityNormalizer::new().normalize(&payload);
        assert!(descriptor.supports.product_type);
        assert!(descriptor.supports.price);
        assert!(descriptor.supports.available);
        assert!(descriptor.supports.tag);
        assert!(descriptor.supports_variant("Color"));
        assert!(descriptor.supports_variant("Size"));
        assert_eq!(
            descriptor.supports.product_metafield,
            vec![MetafieldRef::new("custom", "material")]
        );
        assert_eq!(descriptor.raw.len(), 7);
    }

    #[test]
    fn test_json_encoded_options() {
        let payload = json!({"available_filters": [
            {"label": "Price", "input_options": ["{\"price\": {\"min\": 1}}", "not json"]}
        ]});
        let descriptor = CapabilityNormalizer::new().normalize(&payload);
        assert!(descriptor.supports.price);
        assert!(!descriptor.supports.product_type);
    }

    #[test]
    fn test_missing_payload_is_empty_descriptor() {
        let normalizer = CapabilityNormalizer::new();
        assert!(normalizer.normalize(&json!({})).is_empty());
        assert!(normalizer.normalize(&json!(null)).is_empty());
        assert!(normalizer.normalize(&json!({"available_filters": "broken"})).is_empty());
        assert!(normalizer
            .normalize(&json!({"result": {"content": [{"type": "text", "text": "{oops"}]}}))
            .is_empty());
    }

    #[test]
    fn test_unknown_shapes_ignored_raw_kept() {
        let payload = json!({"available_filters": [
            {"label": "Weird", "values": {"input_options": [{"rating": 5}, 42, null]}},
            {"label": "No options"}
        ]});
        let descriptor = CapabilityNormalizer::new().normalize(&payload);
        assert_eq!(descriptor.raw.len(), 2);
        assert_eq!(descriptor.supports, Default::default());
        assert_eq!(descriptor.filter_names(), vec!["Weird", "No options"]);
    }

    #[test]
    fn test_variant_without_name_ignored() {
        let payload = json!({"available_filters": [
            {"input_options": [{"variantOption": {"value": "Blue"}}, {"productMetafield": {"key": "material"}}]}
        ]});
        let descriptor = CapabilityNormalizer::new().normalize(&payload);
        assert!(descriptor.supports.variant_option.is_empty());
        assert!(descriptor.supports.product_metafield.is_empty());
    }
}
