//! Filter specification and validation records.

use crate::{SemanticFilterIntent, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An ordered note with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedNote {
    pub timestamp: Timestamp,
    pub message: String,
}

impl TimestampedNote {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

/// Outcome of validating an intent against available filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
    Partial,
}

/// Per-category classification of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub supported_filters: Map<String, Value>,
    pub unsupported_filters: Map<String, Value>,
    pub suggested_alternatives: BTreeMap<String, String>,
    pub confidence_score: f64,
    pub notes: Vec<String>,
}

impl ValidationResult {
    /// `supported / total`, or 1.0 when nothing was requested.
    pub fn confidence(supported: usize, total: usize) -> f64 {
        if total == 0 {
            1.0
        } else {
            supported as f64 / total as f64
        }
    }
}

/// Statistics recorded after a search completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultStatistics {
    pub total_products: usize,
    pub has_results: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub product_types: BTreeMap<String, usize>,
}

impl ResultStatistics {
    /// Count products, bucketing missing types under "Unknown".
    pub fn from_product_types<'a, I>(types: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut stats = Self::default();
        for product_type in types {
            stats.total_products += 1;
            let key = product_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("Unknown")
                .to_string();
            *stats.product_types.entry(key).or_insert(0) += 1;
        }
        stats.has_results = stats.total_products > 0;
        stats
    }
}

/// Everything known about one item's filters, from intent to results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub user_intent_filters: SemanticFilterIntent,
    pub api_available_filters: Vec<String>,
    pub applied_query_filters: Map<String, Value>,
    pub result_statistics: Option<ResultStatistics>,
    pub mapping_notes: Vec<TimestampedNote>,
    pub validation_status: ValidationStatus,
    pub confidence_score: f64,
}

impl FilterSpec {
    pub fn new(user_intent_filters: SemanticFilterIntent, api_available_filters: Vec<String>) -> Self {
        Self {
            user_intent_filters,
            api_available_filters,
            applied_query_filters: Map::new(),
            result_statistics: None,
            mapping_notes: Vec::new(),
            validation_status: ValidationStatus::Pending,
            confidence_score: 0.0,
        }
    }

    pub fn add_mapping_note(&mut self, note: impl Into<String>) {
        self.mapping_notes.push(TimestampedNote::now(note));
    }

    /// Note messages without timestamps, in order.
    pub fn note_messages(&self) -> impl Iterator<Item = &str> {
        self.mapping_notes.iter().map(|n| n.message.as_str())
    }
}
