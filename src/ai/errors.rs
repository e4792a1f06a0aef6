//! Error types for response generation.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while generating a reply.
#[derive(Debug, Error)]
pub enum AiError {
    /// No credential is configured.
    #[error("API key not configured")]
    Configuration,

    /// The request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error envelope, if any.
        message: String,
    },

    /// The endpoint reported an error inside a success envelope.
    #[error("API error: {0}")]
    Remote(String),

    /// The response envelope has no recognizable text.
    #[error("unrecognized response envelope: {0}")]
    Envelope(String),

    /// The attempt did not finish before the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint URL is invalid.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    /// The input was empty after trimming.
    #[error("empty input")]
    Validation,

    /// Any other failure reported by a transport implementation.
    #[error("{0}")]
    Other(String),
}

impl AiError {
    /// Check if this error is worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::Other(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Configuration
            | Self::Remote(_)
            | Self::Envelope(_)
            | Self::Endpoint(_)
            | Self::Validation => false,
        }
    }
}

/// Convenience result alias for generation.
pub type AiResult<T> = Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AiError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(AiError::Other("connection reset".into()).is_retryable());
        assert!(
            AiError::Status {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            AiError::Status {
                status: 429,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !AiError::Status {
                status: 400,
                message: "bad request".into()
            }
            .is_retryable()
        );
        assert!(!AiError::Configuration.is_retryable());
        assert!(!AiError::Envelope("{}".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = AiError::Status {
            status: 403,
            message: "API key not valid".into(),
        };
        assert_eq!(err.to_string(), "API error (403): API key not valid");
    }
}
