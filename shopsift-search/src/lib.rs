//! Shopsift Search - catalog search collaborator
//!
//! `SearchClient` is the only way the pipeline reaches the catalog. The HTTP
//! implementation owns transport concerns (timeouts, retries, rate limiting);
//! callers only see a payload or a `SearchError`.

use async_trait::async_trait;
use serde_json::Value;
use shopsift_core::SearchError;

mod client;
mod mock;
mod request;

pub use client::{check_jsonrpc_error, McpSearchClient};
pub use mock::MockSearchClient;
pub use request::{SearchRequest, JSONRPC_VERSION, SEARCH_TOOL_NAME, TEST_CONNECTION_QUERY};

/// Catalog search. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run one search and return the raw response payload.
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError>;

    /// Endpoint description for logs and health output.
    fn endpoint(&self) -> &str;

    /// Minimal search used to check connectivity.
    async fn test_connection(&self) -> Result<Value, SearchError> {
        self.search(&SearchRequest::new(TEST_CONNECTION_QUERY, 1)).await
    }
}
