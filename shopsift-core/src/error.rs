//! Error types for shopsift operations

use thiserror::Error;

/// Search endpoint transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Search request timed out (attempt {attempt})")]
    Timeout { attempt: u32 },

    #[error("Search endpoint rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Invalid search response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Search failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl SearchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Timeout { .. } | SearchError::RateLimited { .. } => true,
            SearchError::RequestFailed { status, .. } => *status == 0 || *status >= 500,
            SearchError::InvalidResponse { .. } | SearchError::RetriesExhausted { .. } => false,
        }
    }
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },
}

/// Row store and checkpoint persistence errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Row {row} not found")]
    RowNotFound { row: usize },

    #[error("Unsupported input format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage unreachable: {reason}")]
    Unreachable { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Pipeline errors that escape a single stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Discovery search failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("Targeted search failed: {reason}")]
    TargetedFailed { reason: String },

    #[error("Response reduction failed: {reason}")]
    ReductionFailed { reason: String },
}

/// Master error type for all shopsift errors.
#[derive(Debug, Clone, Error)]
pub enum ShopsiftError {
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Result type alias for shopsift operations.
pub type ShopsiftResult<T> = Result<T, ShopsiftError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display_retries_exhausted() {
        let err = SearchError::RetriesExhausted {
            attempts: 3,
            last_error: "connection reset".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_search_error_retryable_classification() {
        assert!(SearchError::Timeout { attempt: 1 }.is_retryable());
        assert!(SearchError::RateLimited { retry_after_ms: 10 }.is_retryable());
        assert!(SearchError::RequestFailed {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(SearchError::RequestFailed {
            status: 0,
            message: "connection refused".to_string()
        }
        .is_retryable());
        assert!(!SearchError::RequestFailed {
            status: 400,
            message: "bad request".to_string()
        }
        .is_retryable());
        assert!(!SearchError::InvalidResponse {
            reason: "not json".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_llm_error_display_rate_limited() {
        let err = LlmError::RateLimited {
            provider: "openai".to_string(),
            retry_after_ms: 1500,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Rate limited"));
        assert!(msg.contains("openai"));
        assert!(msg.contains("1500"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "api.base_url".to_string(),
            value: "".to_string(),
            reason: "must not be empty".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("api.base_url"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_shopsift_error_from_variants() {
        let search = ShopsiftError::from(SearchError::Timeout { attempt: 2 });
        assert!(matches!(search, ShopsiftError::Search(_)));

        let llm = ShopsiftError::from(LlmError::ProviderNotConfigured);
        assert!(matches!(llm, ShopsiftError::Llm(_)));

        let storage = ShopsiftError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, ShopsiftError::Storage(_)));

        let config = ShopsiftError::from(ConfigError::MissingRequired {
            field: "api.base_url".to_string(),
        });
        assert!(matches!(config, ShopsiftError::Config(_)));

        let pipeline = ShopsiftError::from(PipelineError::DiscoveryFailed {
            reason: "timeout".to_string(),
        });
        assert!(matches!(pipeline, ShopsiftError::Pipeline(_)));
    }

    #[test]
    fn test_storage_error_display_lock_poisoned() {
        let err = StorageError::LockPoisoned;
        assert_eq!(format!("{}", err), "Storage lock poisoned");
    }
}
