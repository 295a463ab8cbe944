//! Two-phase search: a cheap discovery call to learn capabilities, then a
//! targeted call with adapted filters.

use crate::adapter::FilterAdapter;
use crate::normalizer::CapabilityNormalizer;
use serde_json::Value;
use shopsift_core::{
    CapabilityDescriptor, KeywordExtraction, MappedFilterClause, PipelineError, SearchError,
};
use shopsift_search::{SearchClient, SearchRequest};
use std::sync::Arc;

pub const DEFAULT_DISCOVERY_LIMIT: u32 = 5;
pub const DEFAULT_TARGETED_LIMIT: u32 = 10;
pub const DEFAULT_CONTEXT_PREFIX: &str = "intelligent search";
pub const GENERIC_QUERY: &str = "products";

/// Everything one strategy run produced.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub discovery: Option<Value>,
    pub targeted: Option<Value>,
    pub applied_filters: Vec<MappedFilterClause>,
    pub capabilities: CapabilityDescriptor,
    /// The targeted request as sent, when one was sent.
    pub targeted_request: Option<SearchRequest>,
    pub error: Option<PipelineError>,
}

impl SearchOutcome {
    fn failed(error: PipelineError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.targeted.is_some()
    }
}

pub struct TwoPhaseSearchStrategy {
    client: Arc<dyn SearchClient>,
    adapter: FilterAdapter,
    normalizer: CapabilityNormalizer,
    discovery_limit: u32,
    targeted_limit: u32,
}

impl TwoPhaseSearchStrategy {
    pub fn new(client: Arc<dyn SearchClient>, adapter: FilterAdapter) -> Self {
        Self {
            client,
            adapter,
            normalizer: CapabilityNormalizer::new(),
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
            targeted_limit: DEFAULT_TARGETED_LIMIT,
        }
    }

    pub fn with_limits(mut self, discovery_limit: u32, targeted_limit: u32) -> Self {
        self.discovery_limit = discovery_limit;
        self.targeted_limit = targeted_limit;
        self
    }

    /// Discovery query: product type, else first keyword, else generic.
    pub fn discovery_query(extraction: &KeywordExtraction) -> String {
        extraction
            .filters
            .product_type()
            .map(str::to_string)
            .or_else(|| {
                extraction
                    .keywords
                    .iter()
                    .map(|k| k.trim())
                    .find(|k| !k.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| GENERIC_QUERY.to_string())
    }

    /// Targeted query: clean query, else joined keywords, else generic.
    pub fn targeted_query(extraction: &KeywordExtraction) -> String {
        if let Some(clean) = extraction.clean_query() {
            return clean.to_string();
        }
        let joined = extraction
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            GENERIC_QUERY.to_string()
        } else {
            joined
        }
    }

    /// Run both phases. A failed discovery ends the run with nothing
    /// searched and no filters used.
    pub async fn run(&self, extraction: &KeywordExtraction) -> SearchOutcome {
        let discovery_query = Self::discovery_query(extraction);
        let discovery_request = SearchRequest::new(&discovery_query, self.discovery_limit)
            .with_context(format!("{} discovery: {}", DEFAULT_CONTEXT_PREFIX, discovery_query));

        let discovery = match self.client.search(&discovery_request).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(query = %discovery_query, error = %e, "Discovery search failed");
                return SearchOutcome::failed(PipelineError::DiscoveryFailed {
                    reason: e.to_string(),
                });
            }
        };

        let capabilities = self.normalizer.normalize(&discovery);
        let applied_filters = self.adapter.adapt(&extraction.filters, &capabilities);

        let targeted_query = Self::targeted_query(extraction);
        let targeted_request = SearchRequest::new(&targeted_query, self.targeted_limit)
            .with_context(format!("{}: {}", DEFAULT_CONTEXT_PREFIX, targeted_query))
            .with_non_empty_filters(applied_filters.clone());

        tracing::debug!(
            discovery_query = %discovery_query,
            targeted_query = %targeted_query,
            filters = applied_filters.len(),
            "Running targeted search"
        );

        match self.client.search(&targeted_request).await {
            Ok(targeted) => SearchOutcome {
                discovery: Some(discovery),
                targeted: Some(targeted),
                applied_filters,
                capabilities,
                targeted_request: Some(targeted_request),
                error: None,
            },
            Err(e) => {
                tracing::warn!(query = %targeted_query, error = %e, "Targeted search failed");
                SearchOutcome {
                    discovery: Some(discovery),
                    targeted: None,
                    applied_filters,
                    capabilities,
                    targeted_request: Some(targeted_request),
                    error: Some(targeted_failure(&e)),
                }
            }
        }
    }
}

fn targeted_failure(error: &SearchError) -> PipelineError {
    PipelineError::TargetedFailed {
        reason: error.to_string(),
    }
}

impl std::fmt::Debug for TwoPhaseSearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoPhaseSearchStrategy")
            .field("endpoint", &self.client.endpoint())
            .field("discovery_limit", &self.discovery_limit)
            .field("targeted_limit", &self.targeted_limit)
            .finish()
    }
}
