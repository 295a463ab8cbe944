//! Configuration types
//!
//! Every section has working defaults so a partial settings file is enough.
//! `AppConfig::apply_env_overrides` layers `SHOPSIFT_*` variables on top, and
//! `validate` must pass before anything talks to a collaborator.

use crate::{ConfigError, ShopsiftError, ShopsiftResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_SECS: f64 = 1.0;
pub const DEFAULT_MAX_BACKOFF_SECS: f64 = 30.0;
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_DISCOVERY_LIMIT: u32 = 5;
pub const DEFAULT_TARGETED_LIMIT: u32 = 10;
pub const DEFAULT_PRICE_MIN: f64 = 0.0;
pub const DEFAULT_PRICE_MAX: f64 = 999_999.0;
pub const DEFAULT_TARGET_REDUCTION: f64 = 75.0;
pub const DEFAULT_MAX_TAGS: usize = 5;
pub const DEFAULT_MAX_TAG_CHARS: usize = 100;
pub const DEFAULT_DESCRIPTION_LIMIT: usize = 200;
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 500;
pub const DEFAULT_SHEET_NAME: &str = "Detail";

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ShopsiftError {
    ShopsiftError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

// ============================================================================
// RETRY
// ============================================================================

/// Exponential backoff schedule for transport retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRIES,
            initial_backoff: Duration::from_secs_f64(DEFAULT_BACKOFF_BASE_SECS),
            max_backoff: Duration::from_secs_f64(DEFAULT_MAX_BACKOFF_SECS),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following `attempt` (0-based):
    /// `initial * multiplier^attempt`, capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = (self.backoff_multiplier as f64).powi(attempt.min(32) as i32);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        let capped = secs.min(self.max_backoff.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_backoff
        }
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Search endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_base_secs: f64,
    pub max_backoff_secs: f64,
    pub requests_per_minute: u32,
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            headers: BTreeMap::new(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retries,
            initial_backoff: Duration::from_secs_f64(self.backoff_base_secs.max(0.0)),
            max_backoff: Duration::from_secs_f64(self.max_backoff_secs.max(0.0)),
            backoff_multiplier: 2.0,
        }
    }
}

/// Per-item processing behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub batch_size: usize,
    pub delay_between_requests_secs: f64,
    pub skip_processed: bool,
    pub intelligent_discovery: bool,
    pub strict_filters: bool,
    /// `false` persists the minimal summary instead of typed products.
    pub reduce_responses: bool,
    pub discovery_limit: u32,
    pub targeted_limit: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delay_between_requests_secs: DEFAULT_DELAY_SECS,
            skip_processed: true,
            intelligent_discovery: true,
            strict_filters: false,
            reduce_responses: true,
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
            targeted_limit: DEFAULT_TARGETED_LIMIT,
        }
    }
}

impl ProcessingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_between_requests_secs.max(0.0))
    }
}

/// What to do with filters the catalog cannot apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Fold unsupported intent values into the text query.
    #[default]
    BroadenSearch,
    None,
}

/// Bounds used when a price intent gives only one side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDefaults {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceDefaults {
    fn default() -> Self {
        Self {
            min: DEFAULT_PRICE_MIN,
            max: DEFAULT_PRICE_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub price_default_min: f64,
    pub price_default_max: f64,
    pub fallback_strategy: FallbackStrategy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            price_default_min: DEFAULT_PRICE_MIN,
            price_default_max: DEFAULT_PRICE_MAX,
            fallback_strategy: FallbackStrategy::default(),
        }
    }
}

impl FilterConfig {
    pub fn price_defaults(&self) -> PriceDefaults {
        PriceDefaults {
            min: self.price_default_min,
            max: self.price_default_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Reduction percentage the metrics are compared against. Informational.
    pub target_reduction: f64,
    pub max_tags: usize,
    pub max_tag_chars: usize,
    pub description_limit: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            target_reduction: DEFAULT_TARGET_REDUCTION,
            max_tags: DEFAULT_MAX_TAGS,
            max_tag_chars: DEFAULT_MAX_TAG_CHARS,
            description_limit: DEFAULT_DESCRIPTION_LIMIT,
        }
    }
}

/// Extraction model settings. The API key only ever comes from the
/// environment.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_completion_tokens: u32,
    pub base_url: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            base_url: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("max_completion_tokens", &self.max_completion_tokens)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub sheet_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub sheet_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sheet_path: PathBuf::from("data/workbook.json"),
            checkpoint_path: PathBuf::from("data/checkpoint.json"),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub processing: ProcessingConfig,
    pub filters: FilterConfig,
    pub reducer: ReducerConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Overlay environment variables onto the loaded values.
    ///
    /// # Environment Variables
    /// - `SHOPSIFT_API_BASE_URL`, `SHOPSIFT_API_TIMEOUT_SECS`, `SHOPSIFT_API_RETRIES`
    /// - `SHOPSIFT_REQUESTS_PER_MINUTE`
    /// - `SHOPSIFT_BATCH_SIZE`, `SHOPSIFT_DELAY_SECS`, `SHOPSIFT_SKIP_PROCESSED`
    /// - `SHOPSIFT_INTELLIGENT_DISCOVERY`, `SHOPSIFT_STRICT_FILTERS`, `SHOPSIFT_REDUCE_RESPONSES`
    /// - `SHOPSIFT_SHEET_PATH`, `SHOPSIFT_CHECKPOINT_PATH`, `SHOPSIFT_SHEET_NAME`
    /// - `SHOPSIFT_LLM_MODEL`, `SHOPSIFT_LLM_BASE_URL`, `OPENAI_API_KEY`
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_string("SHOPSIFT_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = env_parse("SHOPSIFT_API_TIMEOUT_SECS") {
            self.api.timeout_secs = timeout;
        }
        if let Some(retries) = env_parse("SHOPSIFT_API_RETRIES") {
            self.api.retries = retries;
        }
        if let Some(rpm) = env_parse("SHOPSIFT_REQUESTS_PER_MINUTE") {
            self.api.requests_per_minute = rpm;
        }
        if let Some(size) = env_parse("SHOPSIFT_BATCH_SIZE") {
            self.processing.batch_size = size;
        }
        if let Some(delay) = env_parse("SHOPSIFT_DELAY_SECS") {
            self.processing.delay_between_requests_secs = delay;
        }
        if let Some(skip) = env_bool("SHOPSIFT_SKIP_PROCESSED") {
            self.processing.skip_processed = skip;
        }
        if let Some(discovery) = env_bool("SHOPSIFT_INTELLIGENT_DISCOVERY") {
            self.processing.intelligent_discovery = discovery;
        }
        if let Some(strict) = env_bool("SHOPSIFT_STRICT_FILTERS") {
            self.processing.strict_filters = strict;
        }
        if let Some(reduce) = env_bool("SHOPSIFT_REDUCE_RESPONSES") {
            self.processing.reduce_responses = reduce;
        }
        if let Some(path) = env_string("SHOPSIFT_SHEET_PATH") {
            self.storage.sheet_path = PathBuf::from(path);
        }
        if let Some(path) = env_string("SHOPSIFT_CHECKPOINT_PATH") {
            self.storage.checkpoint_path = PathBuf::from(path);
        }
        if let Some(name) = env_string("SHOPSIFT_SHEET_NAME") {
            self.storage.sheet_name = name;
        }
        if let Some(model) = env_string("SHOPSIFT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = env_string("SHOPSIFT_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        self.llm.api_key = env_string("OPENAI_API_KEY");
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - api.base_url is set
    /// - timeout, batch size and search limits are non-zero
    /// - request delay and backoff durations are finite and non-negative
    /// - price defaults are ordered
    pub fn validate(&self) -> ShopsiftResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ShopsiftError::Config(ConfigError::MissingRequired {
                field: "api.base_url".to_string(),
            }));
        }
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", 0, "timeout must be greater than 0"));
        }
        if self.api.requests_per_minute == 0 {
            return Err(invalid(
                "api.requests_per_minute",
                0,
                "requests_per_minute must be greater than 0",
            ));
        }
        if self.processing.batch_size == 0 {
            return Err(invalid("processing.batch_size", 0, "batch_size must be greater than 0"));
        }
        for (field, secs) in [
            ("api.backoff_base_secs", self.api.backoff_base_secs),
            ("api.max_backoff_secs", self.api.max_backoff_secs),
            (
                "processing.delay_between_requests_secs",
                self.processing.delay_between_requests_secs,
            ),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(invalid(field, secs, "duration must be a finite, non-negative number of seconds"));
            }
        }
        if self.processing.discovery_limit == 0 {
            return Err(invalid("processing.discovery_limit", 0, "limit must be greater than 0"));
        }
        if self.processing.targeted_limit == 0 {
            return Err(invalid("processing.targeted_limit", 0, "limit must be greater than 0"));
        }
        if self.filters.price_default_min > self.filters.price_default_max {
            return Err(invalid(
                "filters.price_default_min",
                self.filters.price_default_min,
                "price_default_min must not exceed price_default_max",
            ));
        }
        Ok(())
    }
}
