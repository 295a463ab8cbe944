//! Per-item stage machine.
//!
//! Each stage takes the previous stage's output and returns either the next
//! stage's input or a `StageFailure`; `ItemPipeline::process` sequences them
//! with `?`:
//!
//! ```text
//! extract -> adapt -> search -> reduce -> RowResults
//! ```

use crate::artifacts::{
    error_response, extraction_json, model_info, pretty_response, to_pretty,
};
use serde_json::Value;
use shopsift_core::{
    AppConfig, BatchItem, FilterSpec, ItemStage, KeywordExtraction, MappedFilterClause,
    PipelineError, ProcessingConfig, RowResults,
};
use shopsift_llm::{extract_or_fallback, KeywordExtractor};
use shopsift_pipeline::{
    format_fields, naive_filters, summarize_response, FilterAdapter, FilterMapper,
    ResponseReducer, TwoPhaseSearchStrategy,
};
use shopsift_search::{SearchClient, SearchRequest};
use std::sync::Arc;

const FILTER_SPEC_KEY: &str = "filterSpec";

/// A stage that could not produce its output. `partial` holds whatever row
/// fields are worth persisting anyway.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub stage: ItemStage,
    pub error: String,
    pub partial: RowResults,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

pub struct Extracted {
    pub extraction: KeywordExtraction,
    pub fell_back: bool,
    pub json_output: String,
}

pub struct Adapted {
    pub extracted: Extracted,
    pub spec: FilterSpec,
}

pub struct Searched {
    pub adapted: Adapted,
    pub request: SearchRequest,
    pub raw: Value,
    pub discovery: Option<Value>,
    pub used_filters: Vec<MappedFilterClause>,
}

/// Everything needed to take one item from text to row results.
pub struct ItemPipeline {
    extractor: Arc<dyn KeywordExtractor>,
    strategy: TwoPhaseSearchStrategy,
    search: Arc<dyn SearchClient>,
    mapper: FilterMapper,
    reducer: ResponseReducer,
    processing: ProcessingConfig,
}

impl ItemPipeline {
    pub fn new(
        config: &AppConfig,
        extractor: Arc<dyn KeywordExtractor>,
        search: Arc<dyn SearchClient>,
    ) -> Self {
        let adapter = FilterAdapter::new(config.filters.price_defaults());
        let strategy = TwoPhaseSearchStrategy::new(Arc::clone(&search), adapter).with_limits(
            config.processing.discovery_limit,
            config.processing.targeted_limit,
        );
        Self {
            extractor,
            strategy,
            search,
            mapper: FilterMapper::new(config.filters.clone()),
            reducer: ResponseReducer::new(config.reducer.clone()),
            processing: config.processing.clone(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.extractor.model_id()
    }

    /// Run every stage for `item`.
    pub async fn process(&self, item: &BatchItem) -> Result<RowResults, StageFailure> {
        let extracted = self.extract(item).await?;
        let adapted = self.adapt(extracted);
        let searched = self.search(item, adapted).await?;
        self.reduce(searched)
    }

    /// Extraction never fails outright: collaborator errors become the
    /// fallback extraction.
    pub async fn extract(&self, item: &BatchItem) -> Result<Extracted, StageFailure> {
        tracing::debug!(item_id = %item.id, stage = %ItemStage::Extracting, "Stage started");
        let (extraction, fell_back) = extract_or_fallback(self.extractor.as_ref(), &item.input_text).await;
        let extraction = extraction.normalized();
        let json_output = extraction_json(&extraction).map_err(|e| StageFailure {
            stage: ItemStage::Extracting,
            error: e.to_string(),
            partial: RowResults::default(),
        })?;
        Ok(Extracted {
            extraction,
            fell_back,
            json_output,
        })
    }

    pub fn adapt(&self, extracted: Extracted) -> Adapted {
        let spec = self.mapper.create_filter_spec(&extracted.extraction.filters, None);
        tracing::debug!(
            stage = %ItemStage::Adapting,
            status = ?spec.validation_status,
            confidence = spec.confidence_score,
            "Filter spec created"
        );
        Adapted { extracted, spec }
    }

    /// Two-phase search when enabled; a direct search when it is disabled or
    /// produced no targeted payload.
    pub async fn search(&self, item: &BatchItem, adapted: Adapted) -> Result<Searched, StageFailure> {
        let Adapted { extracted, mut spec } = adapted;
        let mut discovery = None;

        if self.processing.intelligent_discovery {
            let outcome = self.strategy.run(&extracted.extraction).await;
            if outcome.discovery.is_some() {
                self.mapper.apply_capabilities(&mut spec, &outcome.capabilities);
            }
            if let (Some(raw), Some(request)) = (outcome.targeted, outcome.targeted_request) {
                return Ok(Searched {
                    adapted: Adapted { extracted, spec },
                    request,
                    raw,
                    discovery: outcome.discovery,
                    used_filters: outcome.applied_filters,
                });
            }
            if let Some(error) = &outcome.error {
                tracing::warn!(item_id = %item.id, error = %error, "Two-phase search failed, using direct search");
            }
            discovery = outcome.discovery;
        }

        let request = self.direct_request(item, &extracted.extraction, &mut spec);
        let used_filters = request.filters.clone().unwrap_or_default();
        tracing::debug!(
            item_id = %item.id,
            stage = %ItemStage::Searching,
            query = %request.query,
            filters = used_filters.len(),
            "Direct search"
        );

        match self.search.search(&request).await {
            Ok(raw) => Ok(Searched {
                adapted: Adapted { extracted, spec },
                request,
                raw,
                discovery,
                used_filters,
            }),
            Err(e) => {
                let error = e.to_string();
                Err(StageFailure {
                    stage: ItemStage::Searching,
                    partial: failed_row(&extracted.json_output, &error),
                    error,
                })
            }
        }
    }

    fn direct_request(
        &self,
        item: &BatchItem,
        extraction: &KeywordExtraction,
        spec: &mut FilterSpec,
    ) -> SearchRequest {
        let mut query = self.mapper.map_to_query_string(spec, &extraction.keywords);
        if query.is_empty() {
            query = extraction
                .clean_query()
                .unwrap_or_else(|| item.input_text.trim())
                .to_string();
        }
        let request = SearchRequest::new(query, self.processing.targeted_limit).with_context(&item.input_text);
        if self.processing.strict_filters {
            request
        } else {
            request.with_non_empty_filters(naive_filters(
                &extraction.filters,
                self.mapper.config().price_defaults(),
            ))
        }
    }

    /// Typed reduction, or the minimal summary when reduction is off.
    pub fn reduce(&self, searched: Searched) -> Result<RowResults, StageFailure> {
        let Searched {
            adapted: Adapted { extracted, mut spec },
            request,
            raw,
            discovery,
            used_filters,
        } = searched;

        let reduction_failed = |reason: String| StageFailure {
            stage: ItemStage::Reducing,
            error: PipelineError::ReductionFailed { reason }.to_string(),
            partial: failed_row(&extracted.json_output, "response reduction failed"),
        };

        let filtered_response = if self.processing.reduce_responses {
            let mut reduced = self.reducer.reduce(&raw);
            self.mapper.update_result_statistics(&mut spec, &reduced);
            reduced.filter_spec = Some(spec);
            let mut value = serde_json::to_value(&reduced).map_err(|e| reduction_failed(e.to_string()))?;
            if let Some(Value::Object(fields)) = value.get_mut(FILTER_SPEC_KEY) {
                *fields = format_fields(std::mem::take(fields));
            }
            value
        } else {
            let used = (!used_filters.is_empty()).then_some(used_filters.as_slice());
            let summary = summarize_response(&raw, discovery.as_ref(), used);
            serde_json::to_value(&summary).map_err(|e| reduction_failed(e.to_string()))?
        };

        let api_request = to_pretty(&request.to_jsonrpc_body()).map_err(|e| reduction_failed(e.to_string()))?;
        let api_response = pretty_response(&raw).map_err(|e| reduction_failed(e.to_string()))?;
        let filtered_response = to_pretty(&filtered_response).map_err(|e| reduction_failed(e.to_string()))?;

        Ok(RowResults {
            model_info: model_info(self.model_id(), extracted.extraction.confidence),
            json_output: extracted.json_output,
            api_request,
            api_response,
            filtered_response,
        })
    }
}

/// Row fields kept for a failed item: the extraction plus the error.
fn failed_row(json_output: &str, error: &str) -> RowResults {
    RowResults {
        json_output: json_output.to_string(),
        api_response: error_response(error).unwrap_or_default(),
        ..Default::default()
    }
}

impl std::fmt::Debug for ItemPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemPipeline")
            .field("model", &self.extractor.model_id())
            .field("endpoint", &self.search.endpoint())
            .field("processing", &self.processing)
            .finish()
    }
}
