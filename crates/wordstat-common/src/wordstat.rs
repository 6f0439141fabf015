/// Client for the Yandex Wordstat `topRequests` endpoint.
///
/// Network access goes through [`WordstatTransport`] so the retry loop in
/// [`WordstatClient`] can be driven by a scripted transport in tests.
/// Requests are issued one at a time; the client never batches or fans out.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FetchError, RetryError};
use crate::retry::{RetryAction, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

pub use reqwest::StatusCode;

#[derive(Clone, Debug)]
pub struct WordstatClientConfig {
    pub base_url: String,
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for WordstatClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.wordstat.yandex.net".to_string(),
            attempt_timeout: Duration::from_secs(30),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_BASE_DELAY,
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl WordstatClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("WORDSTAT_BASE_URL").unwrap_or(defaults.base_url);

        let attempt_timeout = std::env::var("WORDSTAT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.attempt_timeout);

        let max_attempts = std::env::var("WORDSTAT_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.max_attempts);

        let retry_base_delay = std::env::var("WORDSTAT_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_base_delay);

        let max_error_body_bytes = std::env::var("WORDSTAT_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_error_body_bytes);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            attempt_timeout,
            max_attempts,
            retry_base_delay,
            max_error_body_bytes,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_base_delay)
    }
}

/// Request body of `POST /v1/topRequests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopRequestsRequest {
    pub phrase: String,
    pub regions: Vec<u32>,
    pub devices: Vec<String>,
}

/// Successful response of `POST /v1/topRequests`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRequestsResponse {
    #[serde(default)]
    pub request_phrase: Option<String>,
    pub total_count: u64,
    #[serde(default)]
    pub top_requests: Vec<PhraseCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseCount {
    pub phrase: String,
    pub count: u64,
}

/// A single attempt against the Wordstat API.
#[async_trait]
pub trait WordstatTransport: Send + Sync {
    async fn top_requests(
        &self,
        request: &TopRequestsRequest,
    ) -> Result<TopRequestsResponse, FetchError>;
}

/// Production transport: HTTPS with bearer-token authorization.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_error_body_bytes: usize,
}

impl HttpTransport {
    pub fn new(config: &WordstatClientConfig, token: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent("wordstat-parser")
            .timeout(config.attempt_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: token.into(),
            max_error_body_bytes: config.max_error_body_bytes,
        })
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> FetchError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        let message = match serde_json::from_str::<WordstatErrorEnvelope>(&body) {
            Ok(parsed) => parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| "unknown upstream error".to_string()),
            Err(_) => body,
        };
        FetchError::Upstream { status, message }
    }
}

#[async_trait]
impl WordstatTransport for HttpTransport {
    async fn top_requests(
        &self,
        request: &TopRequestsRequest,
    ) -> Result<TopRequestsResponse, FetchError> {
        let url = format!("{}/v1/topRequests", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::to_upstream_error(resp, self.max_error_body_bytes).await);
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Retrying Wordstat client over any transport.
pub struct WordstatClient<T> {
    transport: T,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl<T: WordstatTransport> WordstatClient<T> {
    pub fn new(transport: T, config: &WordstatClientConfig) -> Self {
        Self {
            transport,
            policy: config.retry_policy(),
            attempt_timeout: config.attempt_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the top requests for one phrase.
    ///
    /// Transient failures are retried with linear backoff until the policy's
    /// attempt budget is spent; fatal failures end the loop at once. Either way
    /// the error comes back as a [`RetryError`], never as a panic.
    pub async fn top_requests(
        &self,
        request: &TopRequestsRequest,
    ) -> Result<TopRequestsResponse, RetryError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result =
                match tokio::time::timeout(self.attempt_timeout, self.transport.top_requests(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(self.attempt_timeout)),
                };

            let err = match result {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };

            match self.policy.next_action(attempt, err.kind()) {
                RetryAction::Retry { wait } => {
                    warn!(
                        phrase = %request.phrase,
                        attempt,
                        delay_ms = wait.as_millis(),
                        error = %err,
                        "wordstat request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                RetryAction::GiveUp => {
                    return Err(RetryError {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct WordstatErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
    #[allow(dead_code)]
    code: Option<serde_json::Value>,
}

/// Statuses that callers may want to single out in logs.
pub fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
