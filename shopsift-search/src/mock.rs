//! Scripted search client for tests.

use crate::{SearchClient, SearchRequest};
use async_trait::async_trait;
use serde_json::{json, Value};
use shopsift_core::SearchError;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

/// Answers by exact query first, then from a FIFO queue, then with an empty
/// product list. Every request is recorded.
#[derive(Debug)]
pub struct MockSearchClient {
    by_query: RwLock<HashMap<String, Result<Value, SearchError>>>,
    queue: RwLock<VecDeque<Result<Value, SearchError>>>,
    requests: RwLock<Vec<SearchRequest>>,
    endpoint: String,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self {
            by_query: RwLock::new(HashMap::new()),
            queue: RwLock::new(VecDeque::new()),
            requests: RwLock::new(Vec::new()),
            endpoint: "mock://search".to_string(),
        }
    }

    pub fn with_response_for(self, query: impl Into<String>, payload: Value) -> Self {
        if let Ok(mut map) = self.by_query.write() {
            map.insert(query.into(), Ok(payload));
        }
        self
    }

    pub fn with_error_for(self, query: impl Into<String>, error: SearchError) -> Self {
        if let Ok(mut map) = self.by_query.write() {
            map.insert(query.into(), Err(error));
        }
        self
    }

    pub fn push_response(&self, payload: Value) {
        if let Ok(mut queue) = self.queue.write() {
            queue.push_back(Ok(payload));
        }
    }

    pub fn push_error(&self, error: SearchError) {
        if let Ok(mut queue) = self.queue.write() {
            queue.push_back(Err(error));
        }
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for MockSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        if let Ok(mut requests) = self.requests.write() {
            requests.push(request.clone());
        }
        let scripted = self
            .by_query
            .read()
            .ok()
            .and_then(|map| map.get(&request.query).cloned());
        if let Some(result) = scripted {
            return result;
        }
        let queued = self.queue.write().ok().and_then(|mut q| q.pop_front());
        queued.unwrap_or_else(|| Ok(json!({"products": []})))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_match_beats_queue() {
        let mock = MockSearchClient::new().with_response_for("shirts", json!({"hit": "query"}));
        mock.push_response(json!({"hit": "queue"}));

        let first = mock.search(&SearchRequest::new("shirts", 5)).await.unwrap();
        let second = mock.search(&SearchRequest::new("other", 5)).await.unwrap();
        let third = mock.search(&SearchRequest::new("other", 5)).await.unwrap();

        assert_eq!(first["hit"], "query");
        assert_eq!(second["hit"], "queue");
        assert_eq!(third, json!({"products": []}));
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_records_filters_as_sent() {
        let mock = MockSearchClient::new();
        let _ = mock.search(&SearchRequest::new("a", 1)).await;
        let _ = mock
            .search(&SearchRequest::new("b", 1).with_filters(vec![]))
            .await;
        let requests = mock.requests();
        assert!(requests[0].filters.is_none());
        assert_eq!(requests[1].filters, Some(vec![]));
    }
}
