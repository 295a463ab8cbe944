//! Shopsift Pipeline - capability discovery, filter adaptation, reduction
//!
//! Pure transforms plus the two-phase search strategy:
//!
//! - `CapabilityNormalizer`: discovery payload to `CapabilityDescriptor`
//! - `FilterAdapter`: intent plus descriptor to endpoint filter clauses
//! - `FilterValidator` / `FilterMapper`: supported/unsupported classification,
//!   `FilterSpec` notes and the direct-search query string
//! - `TwoPhaseSearchStrategy`: discovery then targeted search
//! - `ResponseReducer`: raw payload to `FilteredResponse` with size metrics
//!
//! Envelope detection is shared through `extract`.

pub mod extract;

mod adapter;
mod display;
mod mapping;
mod normalizer;
mod reducer;
mod strategy;
mod summary;
mod validator;

pub use adapter::{naive_filters, price_clause, FilterAdapter, COLOR_VARIANT, MATERIAL_METAFIELD_KEY, SIZE_VARIANT};
pub use display::{format_fields, format_filter_spec};
pub use mapping::FilterMapper;
pub use normalizer::{CapabilityNormalizer, AVAILABLE_FILTERS_KEY};
pub use reducer::{ResponseReducer, PRODUCTS_KEY};
pub use strategy::{
    SearchOutcome, TwoPhaseSearchStrategy, DEFAULT_CONTEXT_PREFIX, DEFAULT_DISCOVERY_LIMIT,
    DEFAULT_TARGETED_LIMIT, GENERIC_QUERY,
};
pub use summary::{summarize_response, ResponseSummary};
pub use validator::{
    query_mapping, suggestion_for, FilterValidator, QueryMapping, COMMON_API_FILTERS,
    SEMANTIC_TO_QUERY_MAPPING,
};
