//! Chat-completions transport used by the keyword extractor.
//!
//! One extraction is one `POST {base_url}/chat/completions` carrying a single
//! user message. Calls wait on a per-minute quota shared by every clone of the
//! limiter, and the whole round trip is bounded by the configured timeout.

use super::types::{ApiError, CompletionRequest, CompletionResponse};
use crate::providers::{invalid_response, rate_limited, request_failed};
use governor::{clock::DefaultClock, Quota, RateLimiter};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use shopsift_core::LlmError;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
const PROVIDER: &str = "openai";

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAIClient {
    http: Client,
    api_key: String,
    base_url: String,
    limiter: Arc<DirectRateLimiter>,
}

impl OpenAIClient {
    pub fn new(
        api_key: impl Into<String>,
        requests_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| request_failed(PROVIDER, 0, format!("cannot build HTTP client: {}", e)))?;
        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Point the client at a compatible gateway, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn completions_url(&self) -> String {
        format!("{}/{}", self.base_url, CHAT_COMPLETIONS_PATH)
    }

    /// Send one completion request and decode the answer.
    ///
    /// Transport failures and timeouts surface as `RequestFailed` with
    /// status 0. Non-2xx answers go through [`error_for_status`].
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.limiter.until_ready().await;

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("completion timed out: {}", e)
                } else {
                    format!("completion request failed: {}", e)
                };
                request_failed(PROVIDER, 0, message)
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<CompletionResponse>()
                .await
                .map_err(|e| invalid_response(PROVIDER, format!("undecodable completion: {}", e)));
        }

        let retry_after_ms = parse_retry_after_ms(response.headers());
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), model = %request.model, "Completion rejected");
        Err(error_for_status(status, &body, retry_after_ms))
    }
}

/// 429 becomes `RateLimited` with the `Retry-After` hint (0 when absent).
/// Other statuses keep the API's `error.message`, falling back to the raw
/// body and then the status reason.
fn error_for_status(status: StatusCode, body: &str, retry_after_ms: Option<u64>) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return rate_limited(PROVIDER, retry_after_ms.unwrap_or(0));
    }
    let message = match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    request_failed(PROVIDER, status.as_u16(), message)
}

/// `Retry-After` in seconds (fractions allowed) as milliseconds.
fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("endpoint", &self.completions_url())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
