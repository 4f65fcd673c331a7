//! Error types for generation and their classification.
//!
//! Every provider maps its native failures into [`GenerationError`].
//! Callers that need to react to *what kind* of failure happened (rotate
//! a key, back off, drop a request) should not match on variants
//! directly: they call [`GenerationError::kind`] (or a provider's
//! [`classify_error`](crate::Provider::classify_error) override) and
//! get one of the four [`ErrorKind`]s.
//!
//! | Kind | Typical cause |
//! |------|---------------|
//! | [`ErrorKind::Authentication`] | Missing, expired or rejected credentials |
//! | [`ErrorKind::InvalidRequest`] | Malformed input, context or size limits exceeded |
//! | [`ErrorKind::RateLimit`] | Provider throttling or exhausted quota |
//! | [`ErrorKind::ApiError`] | Everything else, including server errors |
//!
//! The generation loop never retries. [`GenerationError::is_retryable`]
//! exists for callers that implement their own policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The error type returned by provider and generation operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GenerationError {
    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when the request never received a response.
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description of the failure.
        message: String,
        /// Whether the caller may retry this request.
        retryable: bool,
    },

    /// The API key or token was rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The request was malformed or exceeded a size limit.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider throttled the request.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A provider-specific error that doesn't map to another variant.
    #[error("Provider error ({code}): {message}")]
    Provider {
        /// Provider-defined error code (e.g. `"server_error"`).
        code: String,
        /// Human-readable error description.
        message: String,
        /// Whether the caller may retry this request.
        retryable: bool,
    },

    /// A response body or stream payload could not be parsed.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during parsing.
        message: String,
        /// The raw payload, for diagnostics.
        raw: String,
    },

    /// The provider reported an error event in the middle of a stream.
    #[error("Generation failed: {0}")]
    Stream(String),

    /// A model or its pricing is missing from the catalog.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The provider does not offer the requested capability.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The operation exceeded its deadline.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },
}

impl GenerationError {
    /// Returns `true` if the error is transient and the request may succeed on retry.
    ///
    /// ```rust
    /// use gen_stack::GenerationError;
    ///
    /// assert!(GenerationError::Timeout { elapsed_ms: 5000 }.is_retryable());
    /// assert!(!GenerationError::Auth("bad key".into()).is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } | Self::Provider { retryable, .. } => *retryable,
            Self::RateLimited(_) | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Default classification into the closed [`ErrorKind`] taxonomy.
    ///
    /// HTTP failures are classified by status code. Providers with richer
    /// error codes refine this through
    /// [`Provider::classify_error`](crate::Provider::classify_error).
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Authentication,
            Self::InvalidRequest(_) | Self::Catalog(_) => ErrorKind::InvalidRequest,
            Self::RateLimited(_) => ErrorKind::RateLimit,
            Self::Http {
                status: Some(status),
                ..
            } => match status.as_u16() {
                401 | 403 => ErrorKind::Authentication,
                400 | 404 | 413 | 422 => ErrorKind::InvalidRequest,
                429 => ErrorKind::RateLimit,
                _ => ErrorKind::ApiError,
            },
            _ => ErrorKind::ApiError,
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}

/// Closed classification of generation failures.
///
/// This is what the [`ServiceRegistry`](crate::health::ServiceRegistry)
/// receives and what transport layers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing credentials.
    Authentication,
    /// Malformed input or exceeded token/size limits.
    InvalidRequest,
    /// Provider throttling.
    RateLimit,
    /// Catch-all provider-side failure.
    ApiError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authentication => "authentication",
            Self::InvalidRequest => "invalid_request",
            Self::RateLimit => "rate_limit",
            Self::ApiError => "api_error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> GenerationError {
        GenerationError::Http {
            status: Some(http::StatusCode::from_u16(status).unwrap()),
            message: "boom".into(),
            retryable: false,
        }
    }

    #[test]
    fn test_error_display_http() {
        let err = GenerationError::Http {
            status: Some(http::StatusCode::TOO_MANY_REQUESTS),
            message: "rate limited".into(),
            retryable: true,
        };
        let display = format!("{err}");
        assert!(display.contains("429"));
        assert!(display.contains("rate limited"));
    }

    #[test]
    fn test_error_display_stream_carries_provider_message() {
        let err = GenerationError::Stream("model overloaded".into());
        assert_eq!(format!("{err}"), "Generation failed: model overloaded");
    }

    #[test]
    fn test_kind_from_variants() {
        assert_eq!(
            GenerationError::Auth("x".into()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            GenerationError::InvalidRequest("x".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            GenerationError::RateLimited("x".into()).kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            GenerationError::Stream("x".into()).kind(),
            ErrorKind::ApiError
        );
        assert_eq!(
            GenerationError::Timeout { elapsed_ms: 1 }.kind(),
            ErrorKind::ApiError
        );
    }

    #[test]
    fn test_kind_from_status() {
        assert_eq!(http(401).kind(), ErrorKind::Authentication);
        assert_eq!(http(403).kind(), ErrorKind::Authentication);
        assert_eq!(http(400).kind(), ErrorKind::InvalidRequest);
        assert_eq!(http(413).kind(), ErrorKind::InvalidRequest);
        assert_eq!(http(429).kind(), ErrorKind::RateLimit);
        assert_eq!(http(500).kind(), ErrorKind::ApiError);
        assert_eq!(http(503).kind(), ErrorKind::ApiError);
    }

    #[test]
    fn test_kind_without_status_is_api_error() {
        let err = GenerationError::Http {
            status: None,
            message: "connection reset".into(),
            retryable: true,
        };
        assert_eq!(err.kind(), ErrorKind::ApiError);
    }

    #[test]
    fn test_retryable() {
        assert!(GenerationError::RateLimited("slow down".into()).is_retryable());
        assert!(
            GenerationError::Provider {
                code: "server_error".into(),
                message: "oops".into(),
                retryable: true,
            }
            .is_retryable()
        );
        assert!(!GenerationError::Stream("bad".into()).is_retryable());
        assert!(!GenerationError::Catalog("missing".into()).is_retryable());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GenerationError>();
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let err: GenerationError = json_err.into();
        assert!(matches!(err, GenerationError::ResponseFormat { .. }));
    }

    #[test]
    fn test_error_kind_display_matches_serde() {
        for kind in [
            ErrorKind::Authentication,
            ErrorKind::InvalidRequest,
            ErrorKind::RateLimit,
            ErrorKind::ApiError,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
