//! HTTP search client with rate limiting, timeouts and retries.

use crate::{SearchClient, SearchRequest};
use async_trait::async_trait;
use governor::{clock::DefaultClock, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shopsift_core::{ApiConfig, ConfigError, RetryConfig, SearchError, ShopsiftError, ShopsiftResult};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Search client for a JSON-RPC `tools/call` endpoint.
pub struct McpSearchClient {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
    retry: RetryConfig,
    limiter: Arc<DirectRateLimiter>,
}

impl McpSearchClient {
    pub fn new(config: &ApiConfig) -> ShopsiftResult<Self> {
        let endpoint = config.base_url.trim().to_string();
        if endpoint.is_empty() {
            return Err(ShopsiftError::Config(ConfigError::MissingRequired {
                field: "api.base_url".to_string(),
            }));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ShopsiftError::Config(ConfigError::Parse {
                    reason: format!("failed to build HTTP client: {}", e),
                })
            })?;

        let headers = build_headers(config)?;
        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            endpoint,
            headers,
            retry: config.retry_config(),
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    async fn send_once(&self, body: &Value, attempt: u32) -> Result<Value, SearchError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout { attempt }
                } else {
                    SearchError::RequestFailed {
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(|secs| (secs.max(0.0) * 1000.0) as u64)
                .unwrap_or(0);
            return Err(SearchError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout { attempt }
            } else {
                SearchError::InvalidResponse {
                    reason: format!("Failed to parse response: {}", e),
                }
            }
        })?;

        check_jsonrpc_error(payload)
    }
}

/// A JSON-RPC `error` member turns an HTTP 200 into a failure.
pub fn check_jsonrpc_error(payload: Value) -> Result<Value, SearchError> {
    match payload.get("error") {
        Some(error) if !error.is_null() => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Err(SearchError::InvalidResponse {
                reason: format!("JSON-RPC error: {}", message),
            })
        }
        _ => Ok(payload),
    }
}

fn build_headers(config: &ApiConfig) -> ShopsiftResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ShopsiftError::Config(ConfigError::InvalidValue {
                field: format!("api.headers.{}", name),
                value: name.clone(),
                reason: e.to_string(),
            })
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ShopsiftError::Config(ConfigError::InvalidValue {
                field: format!("api.headers.{}", name),
                value: "[hidden]".to_string(),
                reason: e.to_string(),
            })
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Backoff before the next attempt, honouring a server-supplied retry-after.
fn backoff_for(retry: &RetryConfig, attempt: u32, error: &SearchError) -> Duration {
    let scheduled = retry.delay_for(attempt);
    match error {
        SearchError::RateLimited { retry_after_ms } if *retry_after_ms > 0 => {
            scheduled.max(Duration::from_millis(*retry_after_ms)).min(retry.max_backoff)
        }
        _ => scheduled,
    }
}

#[async_trait]
impl SearchClient for McpSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let body = request.to_jsonrpc_body();
        let attempts = self.retry.max_retries.max(1);
        let mut last_error: Option<SearchError> = None;

        for attempt in 0..attempts {
            tracing::debug!(
                query = %request.query,
                attempt = attempt + 1,
                attempts,
                "Search request"
            );
            match self.send_once(&body, attempt + 1).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(error = %e, attempt = attempt + 1, "Search attempt failed");
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff_for(&self.retry, attempt, &e)).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(SearchError::RetriesExhausted {
            attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for McpSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSearchClient")
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("retry", &self.retry)
            .finish()
    }
}
