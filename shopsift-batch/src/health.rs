//! Connectivity checks for `--test`.

use shopsift_core::{HealthCheck, HealthReport};
use shopsift_llm::KeywordExtractor;
use shopsift_search::SearchClient;
use shopsift_storage::{RowStore, FIRST_DATA_ROW};
use std::time::Instant;

pub const STORAGE_COMPONENT: &str = "storage";
pub const SEARCH_COMPONENT: &str = "search";
pub const EXTRACTION_COMPONENT: &str = "extraction";

const HEALTH_QUERY: &str = "test query";

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// Check storage, search and extraction. Never fails; every problem is
/// reported as an unhealthy check.
pub async fn test_all_services(
    store: &dyn RowStore,
    search: &dyn SearchClient,
    extractor: &dyn KeywordExtractor,
) -> HealthReport {
    let mut report = HealthReport::default();

    let started = Instant::now();
    let storage = match store.read_rows(FIRST_DATA_ROW, Some(FIRST_DATA_ROW + 1)).await {
        Ok(rows) => HealthCheck::healthy(STORAGE_COMPONENT)
            .with_message(format!("read {} rows from {}", rows.len(), store.source())),
        Err(e) => HealthCheck::unhealthy(STORAGE_COMPONENT, e.to_string()),
    };
    report.push(storage.with_response_time(elapsed_ms(started)));

    let started = Instant::now();
    let search_check = match search.test_connection().await {
        Ok(_) => HealthCheck::healthy(SEARCH_COMPONENT).with_message(search.endpoint().to_string()),
        Err(e) => HealthCheck::unhealthy(SEARCH_COMPONENT, e.to_string()),
    };
    report.push(search_check.with_response_time(elapsed_ms(started)));

    let started = Instant::now();
    let extraction = match extractor.extract(HEALTH_QUERY).await {
        Ok(result) => HealthCheck::healthy(EXTRACTION_COMPONENT)
            .with_message(extractor.model_id().to_string())
            .with_metadata("keywords", serde_json::json!(result.keywords)),
        Err(e) => HealthCheck::unhealthy(EXTRACTION_COMPONENT, e.to_string()),
    };
    report.push(extraction.with_response_time(elapsed_ms(started)));

    for check in &report.checks {
        if check.is_healthy() {
            tracing::info!(component = %check.component, response_time_ms = ?check.response_time_ms, "Service healthy");
        } else {
            tracing::error!(component = %check.component, message = ?check.message, "Service unhealthy");
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsift_core::{LlmError, SearchError, StorageError};
    use shopsift_llm::MockKeywordExtractor;
    use shopsift_search::MockSearchClient;
    use shopsift_storage::MockRowStore;

    #[tokio::test]
    async fn test_all_healthy() {
        let store = MockRowStore::with_inputs(["a", "b", "c"]);
        let search = MockSearchClient::new();
        let extractor = MockKeywordExtractor::new();
        let report = test_all_services(&store, &search, &extractor).await;

        assert!(report.all_healthy());
        assert_eq!(report.checks.len(), 3);
        assert_eq!(
            report.get(STORAGE_COMPONENT).and_then(|c| c.message.clone()).as_deref(),
            Some("read 2 rows from mock://sheet#Detail")
        );
        assert_eq!(search.requests()[0].query, "test connection");
        assert_eq!(extractor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_component() {
        let store = MockRowStore::new();
        store.fail_reads_with(StorageError::Unreachable { reason: "offline".to_string() });
        let search = MockSearchClient::new();
        search.push_error(SearchError::Timeout { attempt: 3 });
        let extractor = MockKeywordExtractor::new().with_error(HEALTH_QUERY, LlmError::ProviderNotConfigured);

        let report = test_all_services(&store, &search, &extractor).await;
        assert!(!report.all_healthy());
        assert!(report.checks.iter().all(|c| !c.is_healthy()));
        assert!(report
            .get(STORAGE_COMPONENT)
            .and_then(|c| c.message.as_deref())
            .is_some_and(|m| m.contains("offline")));
        assert!(report.checks.iter().all(|c| c.response_time_ms.is_some()));
    }
}
