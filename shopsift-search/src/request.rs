//! Search request and JSON-RPC body construction.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopsift_core::MappedFilterClause;

pub const SEARCH_TOOL_NAME: &str = "search_shop_catalog";
pub const JSONRPC_VERSION: &str = "2.0";
pub const TEST_CONNECTION_QUERY: &str = "test connection";

/// One search call. `filters: None` omits the argument entirely, which the
/// endpoint treats differently from an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub context: String,
    pub limit: u32,
    pub filters: Option<Vec<MappedFilterClause>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: u32) -> Self {
        Self {
            query: query.into(),
            context: String::new(),
            limit,
            filters: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_filters(mut self, filters: Vec<MappedFilterClause>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Attach filters only when there is at least one.
    pub fn with_non_empty_filters(mut self, filters: Vec<MappedFilterClause>) -> Self {
        self.filters = (!filters.is_empty()).then_some(filters);
        self
    }

    /// Context sent on the wire; blank context gets a generated one.
    pub fn effective_context(&self) -> String {
        if self.context.trim().is_empty() {
            format!("Customer searching for: {}", self.query)
        } else {
            self.context.clone()
        }
    }

    /// JSON-RPC 2.0 `tools/call` body.
    pub fn to_jsonrpc_body(&self) -> Value {
        let mut arguments = json!({
            "query": self.query,
            "context": self.effective_context(),
            "limit": self.limit,
        });
        if let (Some(filters), Some(args)) = (&self.filters, arguments.as_object_mut()) {
            args.insert("filters".to_string(), json!(filters));
        }
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": "tools/call",
            "id": 1,
            "params": {
                "name": SEARCH_TOOL_NAME,
                "arguments": arguments,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_without_filters_omits_key() {
        let body = SearchRequest::new("shirts", 5).to_jsonrpc_body();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "tools/call");
        assert_eq!(body["params"]["name"], SEARCH_TOOL_NAME);
        let args = &body["params"]["arguments"];
        assert_eq!(args["query"], "shirts");
        assert_eq!(args["context"], "Customer searching for: shirts");
        assert_eq!(args["limit"], 5);
        assert!(args.get("filters").is_none());
    }

    #[test]
    fn test_body_with_empty_filters_keeps_key() {
        let body = SearchRequest::new("shirts", 5)
            .with_filters(vec![])
            .to_jsonrpc_body();
        assert_eq!(body["params"]["arguments"]["filters"], json!([]));
    }

    #[test]
    fn test_non_empty_filters_helper() {
        let request = SearchRequest::new("q", 1).with_non_empty_filters(vec![]);
        assert!(request.filters.is_none());
        let request = SearchRequest::new("q", 1)
            .with_non_empty_filters(vec![MappedFilterClause::Available(true)]);
        assert_eq!(request.filters.map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_explicit_context_kept() {
        let body = SearchRequest::new("hats", 10)
            .with_context("intelligent search")
            .to_jsonrpc_body();
        assert_eq!(body["params"]["arguments"]["context"], "intelligent search");
    }
}
