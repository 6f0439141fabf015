/// Error types shared by the Wordstat client and its callers.
///
/// `FetchError` describes a single failed attempt. Whether the attempt may be
/// repeated is decided by [`FetchError::kind`]; the retry loop itself lives in
/// `crate::retry` and `crate::wordstat`.
use std::time::Duration;

use reqwest::StatusCode;

/// Coarse classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection problems, timeouts, throttling and server-side errors.
    Transient,
    /// Authorization failures, rejected requests, unreadable responses.
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Request(e) => {
                if e.is_decode() {
                    ErrorKind::Fatal
                } else if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Fatal
                }
            }
            FetchError::Timeout(_) => ErrorKind::Transient,
            FetchError::Upstream { status, .. } => {
                if *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || status.is_server_error()
                {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Fatal
                }
            }
            FetchError::InvalidJson(_) => ErrorKind::Fatal,
        }
    }
}

/// Terminal failure of a request after the retry loop gave up.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryError {
    /// Number of attempts actually made, including the last one.
    pub attempts: u32,
    /// Error of the last attempt.
    #[source]
    pub last: FetchError,
}

impl RetryError {
    pub fn kind(&self) -> ErrorKind {
        self.last.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: StatusCode) -> FetchError {
        FetchError::Upstream {
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        assert_eq!(upstream(StatusCode::TOO_MANY_REQUESTS).kind(), ErrorKind::Transient);
        assert_eq!(upstream(StatusCode::SERVICE_UNAVAILABLE).kind(), ErrorKind::Transient);
        assert_eq!(upstream(StatusCode::INTERNAL_SERVER_ERROR).kind(), ErrorKind::Transient);
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(30)).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn rejections_are_fatal() {
        assert_eq!(upstream(StatusCode::UNAUTHORIZED).kind(), ErrorKind::Fatal);
        assert_eq!(upstream(StatusCode::FORBIDDEN).kind(), ErrorKind::Fatal);
        assert_eq!(upstream(StatusCode::BAD_REQUEST).kind(), ErrorKind::Fatal);

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(FetchError::InvalidJson(json_err).kind(), ErrorKind::Fatal);
    }

    #[test]
    fn retry_error_reports_attempts() {
        let err = RetryError {
            attempts: 3,
            last: upstream(StatusCode::BAD_GATEWAY),
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().starts_with("gave up after 3 attempt(s)"));
    }
}
