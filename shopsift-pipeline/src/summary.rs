//! Minimal response summary, used when typed reduction is switched off.

use crate::extract::locate_array;
use crate::normalizer::AVAILABLE_FILTERS_KEY;
use crate::reducer::PRODUCTS_KEY;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopsift_core::MappedFilterClause;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub products_count: usize,
    pub product_titles: Vec<String>,
    pub available_filters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_filters: Option<Vec<MappedFilterClause>>,
}

/// Count and titles from `targeted`; available filters from `targeted`,
/// else from `discovery`.
pub fn summarize_response(
    targeted: &Value,
    discovery: Option<&Value>,
    used_filters: Option<&[MappedFilterClause]>,
) -> ResponseSummary {
    let products = locate_array(targeted, PRODUCTS_KEY).unwrap_or_default();
    let product_titles = products
        .iter()
        .filter_map(|p| {
            ["title", "name"]
                .iter()
                .filter_map(|key| p.get(*key))
                .find_map(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
        })
        .collect();

    let available_filters = locate_array(targeted, AVAILABLE_FILTERS_KEY)
        .or_else(|| discovery.and_then(|d| locate_array(d, AVAILABLE_FILTERS_KEY)))
        .unwrap_or_default();

    ResponseSummary {
        products_count: products.len(),
        product_titles,
        available_filters,
        used_filters: used_filters.map(<[MappedFilterClause]>::to_vec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_from_nested_payload() {
        let targeted = json!({"result": {"content": [{"type": "text", "text": json!({
            "products": [{"title": "Blue Tee"}, {"name": "Navy Tee"}, {"id": "3"}],
            "available_filters": [{"label": "Color"}]
        }).to_string()}]}});
        let filters = vec![MappedFilterClause::variant("Color", "Blue")];
        let summary = summarize_response(&targeted, None, Some(&filters));

        assert_eq!(summary.products_count, 3);
        assert_eq!(summary.product_titles, vec!["Blue Tee", "Navy Tee"]);
        assert_eq!(summary.available_filters, vec![json!({"label": "Color"})]);
        assert_eq!(
            serde_json::to_value(&summary).unwrap()["used_filters"],
            json!([{"variantOption": {"name": "Color", "value": "Blue"}}])
        );
    }

    #[test]
    fn test_discovery_filters_fill_gap() {
        let discovery = json!({"available_filters": [{"label": "Price"}]});
        let summary = summarize_response(&json!({"products": []}), Some(&discovery), None);
        assert_eq!(summary.products_count, 0);
        assert_eq!(summary.available_filters, vec![json!({"label": "Price"})]);
        assert!(serde_json::to_value(&summary).unwrap().get("used_filters").is_none());
    }
}
