//! Error types for the Ragline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; `ReplyError` is the only error a
//! caller of the pipeline ever sees.

use thiserror::Error;

/// The caller-facing error for a `reply` call.
///
/// Every variant here is fatal: the pipeline returns no partial response.
/// Rate limiting and malformed model output on the primary answer are not
/// errors at all; they surface as a degraded answer instead.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Chat history is empty or the last turn carries no user question")]
    EmptyHistory,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Failed to generate search query: {0}")]
    QueryGeneration(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Completion failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("Follow-up questions unusable: {0}")]
    Followup(String),

    #[error("Reply cancelled")]
    Cancelled,
}

impl ReplyError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmptyHistory | Self::Cancelled | Self::Followup(_) => false,
            Self::Generation(e) => !matches!(
                e,
                ProviderError::AuthenticationFailed(_)
                    | ProviderError::ModelNotFound(_)
                    | ProviderError::NotConfigured(_)
            ),
            Self::Embedding(_)
            | Self::QueryGeneration(_)
            | Self::Retrieval(_)
            | Self::Credential(_) => true,
        }
    }
}

/// Result type alias using `ReplyError`.
pub type Result<T> = std::result::Result<T, ReplyError>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// True when the provider signalled HTTP 429 semantics.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ApiError { status_code: 429, .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Search backend failed: {0}")]
    Backend(String),

    #[error("Failed to load corpus at {path}: {reason}")]
    Corpus { path: String, reason: String },

    #[error("Vectorization failed: {0}")]
    Vectorization(String),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No credential available for scope {0}")]
    Unavailable(String),

    #[error("Token request failed: {0}")]
    RequestFailed(String),
}

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("Variant provider unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ReplyError::Generation(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn rate_limit_detection() {
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_rate_limited());
        assert!(
            ProviderError::ApiError {
                status_code: 429,
                message: "Too many requests".into(),
            }
            .is_rate_limited()
        );
        assert!(!ProviderError::Network("reset".into()).is_rate_limited());
    }

    #[test]
    fn empty_history_is_not_retryable() {
        assert!(!ReplyError::EmptyHistory.is_retryable());
        assert!(!ReplyError::Cancelled.is_retryable());
        assert!(!ReplyError::Followup("not a list".into()).is_retryable());
        assert!(ReplyError::Retrieval(RetrievalError::Backend("down".into())).is_retryable());
        assert!(
            !ReplyError::Generation(ProviderError::AuthenticationFailed("bad key".into()))
                .is_retryable()
        );
    }
}
