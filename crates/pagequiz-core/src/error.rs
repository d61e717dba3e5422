//! Error types.
//!
//! `ProviderError` represents failures when talking to a generative-text
//! provider. It is defined in `pagequiz-core` so the generation client can
//! downcast and classify errors for fallback decisions without string
//! matching.
//!
//! `ExamError` is the terminal error surfaced by an exam session. Anything
//! that can still degrade to a fallback tier never reaches the caller.

use thiserror::Error;

/// Errors that can occur when interacting with a generative-text provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response body was not the expected shape, or carried an error field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if retrying against the same provider cannot help.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Terminal failures of the exam pipeline.
#[derive(Debug, Error)]
pub enum ExamError {
    /// No document is attached to the session.
    #[error("no document is available to read")]
    DocumentUnavailable,

    /// The document could not report its basic shape.
    #[error("document error: {0:#}")]
    Document(#[source] anyhow::Error),

    /// The selected pages produced too little text to examine.
    #[error("insufficient content: {chars} characters extracted, at least {min} required")]
    InsufficientContent { chars: usize, min: usize },

    /// A chapter-based selection resolved to no pages.
    #[error("the selected chapters contain no pages")]
    NoContentForChapters,

    /// Every provider failed and the heuristic generator produced nothing.
    #[error("question generation exhausted after {attempts} provider attempt(s)")]
    GenerationExhausted { attempts: usize },

    /// The exam configuration is unusable.
    #[error("invalid exam configuration: {0}")]
    InvalidConfig(String),

    /// The requested transition needs an exam that is in progress or submitted.
    #[error("no active exam")]
    NoActiveExam,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_provider_errors() {
        assert!(ProviderError::ModelNotFound("m".into()).is_permanent());
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(!ProviderError::RateLimited { retry_after_ms: 10 }.is_permanent());
        assert!(!ProviderError::NetworkError("reset".into()).is_permanent());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        assert_eq!(
            ProviderError::RateLimited {
                retry_after_ms: 5000
            }
            .retry_after_ms(),
            Some(5000)
        );
        assert_eq!(ProviderError::Timeout(3).retry_after_ms(), None);
    }

    #[test]
    fn provider_error_survives_anyhow_downcast() {
        let err: anyhow::Error = ProviderError::ModelNotFound("gemini-x".into()).into();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::ModelNotFound(m)) if m == "gemini-x"
        ));
    }

    #[test]
    fn insufficient_content_message() {
        let err = ExamError::InsufficientContent { chars: 12, min: 100 };
        assert!(err.to_string().contains("12 characters"));
    }
}
