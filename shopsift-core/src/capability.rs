//! Capability descriptor: which filters a catalog advertises.
//!
//! Built once per discovery call and read-only afterwards. A flag is only
//! `true` when the raw payload advertised it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A `(namespace, key)` pair identifying a product metafield filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetafieldRef {
    pub namespace: String,
    pub key: String,
}

impl MetafieldRef {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

/// Supported filter kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySupport {
    pub product_type: bool,
    pub price: bool,
    pub available: bool,
    pub tag: bool,
    /// Variant option names (canonical title case) to support flag.
    pub variant_option: BTreeMap<String, bool>,
    pub product_metafield: Vec<MetafieldRef>,
}

/// Normalized capability record for one catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub supports: CapabilitySupport,
    /// The advertised filter entries, untouched.
    pub raw: Vec<Value>,
}

impl CapabilityDescriptor {
    /// Descriptor that supports nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.supports == CapabilitySupport::default()
    }

    pub fn with_product_type(mut self, supported: bool) -> Self {
        self.supports.product_type = supported;
        self
    }

    pub fn with_price(mut self, supported: bool) -> Self {
        self.supports.price = supported;
        self
    }

    pub fn with_available(mut self, supported: bool) -> Self {
        self.supports.available = supported;
        self
    }

    pub fn with_tag(mut self, supported: bool) -> Self {
        self.supports.tag = supported;
        self
    }

    pub fn with_variant(mut self, name: impl Into<String>, supported: bool) -> Self {
        self.supports.variant_option.insert(name.into(), supported);
        self
    }

    /// Register a metafield; duplicates are ignored.
    pub fn with_metafield(mut self, metafield: MetafieldRef) -> Self {
        self.add_metafield(metafield);
        self
    }

    pub fn add_metafield(&mut self, metafield: MetafieldRef) {
        if !self.supports.product_metafield.contains(&metafield) {
            self.supports.product_metafield.push(metafield);
        }
    }

    /// Whether the named variant option is advertised. Absence means no.
    pub fn supports_variant(&self, name: &str) -> bool {
        self.supports
            .variant_option
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    /// First metafield whose key is `key`, compared case-insensitively.
    pub fn metafield_for_key(&self, key: &str) -> Option<&MetafieldRef> {
        self.supports
            .product_metafield
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case(key))
    }

    /// Human-facing filter names: advertised labels first, then one name per
    /// supported flag. Used for name-based validation.
    pub fn filter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .raw
            .iter()
            .filter_map(|entry| entry.get("label").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let flags = [
            (self.supports.product_type, "Product Type"),
            (self.supports.price, "Price"),
            (self.supports.available, "Availability"),
            (self.supports.tag, "Tag"),
        ];
        for (supported, name) in flags {
            if supported {
                names.push(name.to_string());
            }
        }
        for (name, supported) in &self.supports.variant_option {
            if *supported {
                names.push(name.clone());
            }
        }
        for metafield in &self.supports.product_metafield {
            names.push(metafield.key.clone());
        }

        let mut seen = std::collections::HashSet::new();
        names.retain(|name| seen.insert(name.to_lowercase()));
        names
    }
}
