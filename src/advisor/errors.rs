//! Recommendation service errors

use std::fmt;
use std::fmt::Display;
use std::time::Duration;

/// Coarse failure class reported to HTTP callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service could not be reached or refused the request
    Unavailable,
    /// The service answered but the content was unusable
    BadResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unavailable => "unavailable",
            FailureKind::BadResponse => "bad_response",
        }
    }
}

#[derive(Debug)]
pub enum AdvisorError {
    /// No API key configured
    MissingApiKey,

    /// Transport level failure (DNS, connect, TLS, reset)
    Unavailable(String),

    /// No answer within the configured bound
    Timeout(Duration),

    /// Non-2xx reply from the service
    Upstream {
        status: u16,
        message: String,
    },

    /// The reply could not be decoded into plant suggestions
    ///
    /// Occurs when:
    /// - the body exceeds the size cap or is not UTF-8
    /// - the envelope carries no candidate text
    /// - the model text is neither a suggestion array nor a string wrapping one
    BadResponse(String),
}

impl AdvisorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AdvisorError::BadResponse(_) => FailureKind::BadResponse,
            _ => FailureKind::Unavailable,
        }
    }
}

impl std::error::Error for AdvisorError {}

impl Display for AdvisorError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AdvisorError::MissingApiKey => "recommendation service API key is not configured".fmt(fmt),
            AdvisorError::Unavailable(e) => write!(fmt, "recommendation service unavailable: {}", e),
            AdvisorError::Timeout(limit) => {
                write!(fmt, "recommendation service timed out after {}s", limit.as_secs_f64())
            }
            AdvisorError::Upstream { status, message } => {
                write!(fmt, "recommendation service returned {}: {}", status, message)
            }
            AdvisorError::BadResponse(e) => write!(fmt, "invalid recommendation response: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(AdvisorError::MissingApiKey.kind(), FailureKind::Unavailable);
        assert_eq!(AdvisorError::Timeout(Duration::from_secs(30)).kind(), FailureKind::Unavailable);
        assert_eq!(
            AdvisorError::Upstream { status: 503, message: "overloaded".into() }.kind(),
            FailureKind::Unavailable
        );
        assert_eq!(AdvisorError::BadResponse("x".into()).kind(), FailureKind::BadResponse);
        assert_eq!(FailureKind::BadResponse.as_str(), "bad_response");
    }

    #[test]
    fn test_messages_not_empty() {
        let errors = [
            AdvisorError::MissingApiKey,
            AdvisorError::Unavailable(String::new()),
            AdvisorError::Timeout(Duration::from_millis(1500)),
            AdvisorError::BadResponse(String::new()),
        ];
        for e in errors {
            assert!(!e.to_string().is_empty());
        }
        assert_eq!(
            AdvisorError::Timeout(Duration::from_millis(1500)).to_string(),
            "recommendation service timed out after 1.5s"
        );
    }
}
