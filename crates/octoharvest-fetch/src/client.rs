//! HTTP transport with bounded retry and credential attachment.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use octoharvest_types::HarvestError;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::page::parse_last_page;
use crate::rate::{CredentialPool, RateDecision, RateLimitConfig, RateObservation};

/// Configuration for the API transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the upstream API.
    pub api_base: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum attempts per request for transient failures.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
    /// User agent string.
    pub user_agent: String,
    /// Quota handling knobs.
    pub rate: RateLimitConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 5,
            base_delay_ms: 500,   // Start with 500ms delay
            max_delay_ms: 30_000, // Max 30 seconds between retries
            user_agent: format!("octoharvest/{}", env!("CARGO_PKG_VERSION")),
            rate: RateLimitConfig::default(),
        }
    }
}

/// Errors surfaced by the transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request failed at the connection level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transient statuses persisted across all attempts.
    #[error("server error {status} after {attempts} attempts")]
    RetriesExhausted {
        /// Last transient status observed.
        status: u16,
        /// Attempts performed.
        attempts: u32,
    },

    /// Upstream returned a non-transient error status.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Rate budget exhausted with no reset information.
    #[error("rate limit exhausted with no reset time")]
    RateExhausted,
}

impl From<TransportError> for HarvestError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http(e) => Self::Transport(e.to_string()),
            TransportError::RetriesExhausted { status, .. }
            | TransportError::Status { status } => Self::Status { status },
            TransportError::RateExhausted => Self::RateExhausted,
        }
    }
}

/// One fetched page of raw items, with the pagination hint when present.
#[derive(Debug, Clone)]
pub(crate) struct RawPage {
    pub(crate) items: Vec<serde_json::Value>,
    pub(crate) last_page_hint: Option<u32>,
}

/// HTTP client that attaches the active credential, observes rate state on
/// every response, and retries transient failures with exponential backoff.
///
/// Has no knowledge of pagination cursors or entity semantics.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    pool: Mutex<CredentialPool>,
    config: ClientConfig,
}

impl ApiClient {
    /// Creates a new client over the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable credential is supplied or the HTTP
    /// client cannot be created.
    pub fn new(tokens: Vec<String>, config: ClientConfig) -> Result<Self, HarvestError> {
        let pool = CredentialPool::new(tokens, config.rate)?;
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| HarvestError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            pool: Mutex::new(pool),
            config,
        })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable credential is supplied.
    pub fn with_defaults(tokens: Vec<String>) -> Result<Self, HarvestError> {
        Self::new(tokens, ClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of credentials the client rotates over.
    #[must_use]
    pub fn credential_count(&self) -> usize {
        self.lock_pool().len()
    }

    /// Fetches one page of a collection endpoint as a raw JSON array.
    ///
    /// The active credential is re-acquired per attempt, so a rotation
    /// between attempts takes effect immediately. Rate-limit sleeps
    /// signalled by the pool retry the same request without consuming an
    /// attempt.
    pub(crate) async fn get_page(
        &self,
        path: &str,
        query: &[(String, String)],
        accept: &str,
    ) -> Result<RawPage, TransportError> {
        let url = format!("{}{}", self.config.api_base, path);
        let mut attempts = 0;

        loop {
            let token = self.lock_pool().acquire().to_string();
            let result = self
                .client
                .get(&url)
                .query(query)
                .header(AUTHORIZATION, format!("token {token}"))
                .header(ACCEPT, accept)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let obs = rate_observation(status, response.headers());
                    let decision = self.lock_pool().observe(&obs, Utc::now());

                    match decision {
                        RateDecision::RetryAfter(wait) => {
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        RateDecision::Exhausted => return Err(TransportError::RateExhausted),
                        RateDecision::Proceed => {}
                    }

                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        attempts += 1;
                        if attempts < self.config.max_attempts {
                            let delay = self.backoff_delay(attempts);
                            warn!(
                                status = status.as_u16(),
                                attempt = attempts,
                                delay_ms = delay.as_millis() as u64,
                                %url,
                                "transient upstream error, backing off"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(TransportError::RetriesExhausted {
                            status: status.as_u16(),
                            attempts,
                        });
                    }

                    if !status.is_success() {
                        return Err(TransportError::Status {
                            status: status.as_u16(),
                        });
                    }

                    let last_page_hint = response
                        .headers()
                        .get(LINK)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_last_page);

                    let items: Vec<serde_json::Value> = response.json().await?;
                    debug!(%url, items = items.len(), ?last_page_hint, "page fetched");
                    return Ok(RawPage {
                        items,
                        last_page_hint,
                    });
                }
                Err(e) if is_retryable(&e) && attempts + 1 < self.config.max_attempts => {
                    attempts += 1;
                    let delay = self.backoff_delay(attempts);
                    warn!(
                        error = %e,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "connection-level failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Calculates the backoff delay with exponential backoff and jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff: base_delay * 2^attempt
        let exp_delay = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(10));

        // Cap at max delay
        let capped_delay = exp_delay.min(self.config.max_delay_ms);

        // Add jitter (~±25%), deterministic so no RNG is needed
        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let jitter_offset = (u64::from(attempt) * 17) % (jitter_range * 2);
            jitter_offset.saturating_sub(jitter_range)
        } else {
            0
        };

        let final_delay = (capped_delay as i64 + jitter as i64).max(100) as u64;
        Duration::from_millis(final_delay)
    }

    fn lock_pool(&self) -> std::sync::MutexGuard<'_, CredentialPool> {
        // The single sequential flow never poisons the lock.
        self.pool
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Determines if a connection-level error is retryable.
fn is_retryable(error: &reqwest::Error) -> bool {
    // Don't retry builder errors (configuration issues)
    if error.is_builder() {
        return false;
    }

    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Parses rate-limit headers into an observation for the pool.
fn rate_observation(status: StatusCode, headers: &HeaderMap) -> RateObservation {
    let remaining = header_u64(headers, "x-ratelimit-remaining").map(|v| v as u32);
    let reset_at = header_u64(headers, "x-ratelimit-reset")
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));

    RateObservation {
        status: status.as_u16(),
        remaining,
        reset_at,
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.base_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
    }

    #[test]
    fn test_client_rejects_empty_tokens() {
        let client = ApiClient::with_defaults(vec![]);
        assert!(client.is_err());
    }

    #[test]
    fn test_backoff_delay_calculation() {
        let client = ApiClient::with_defaults(vec!["t".to_string()]).unwrap();

        // First attempt: base_delay * 2 = 1000ms (plus jitter)
        let delay1 = client.backoff_delay(1);
        assert!(delay1.as_millis() >= 750 && delay1.as_millis() <= 1250);

        // Second attempt: base_delay * 4 = 2000ms (plus jitter)
        let delay2 = client.backoff_delay(2);
        assert!(delay2.as_millis() >= 1500 && delay2.as_millis() <= 2500);

        // High attempt should be capped at max_delay
        let delay_high = client.backoff_delay(20);
        assert!(delay_high.as_millis() <= 37_500);
    }

    #[test]
    fn test_rate_observation_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("42"));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_static("1714560000"),
        );

        let obs = rate_observation(StatusCode::OK, &headers);
        assert_eq!(obs.remaining, Some(42));
        assert_eq!(
            obs.reset_at,
            DateTime::<Utc>::from_timestamp(1_714_560_000, 0)
        );
        assert!(!obs.is_exhausted());
    }

    #[test]
    fn test_rate_observation_missing_headers() {
        let obs = rate_observation(StatusCode::OK, &HeaderMap::new());
        assert_eq!(obs.remaining, None);
        assert_eq!(obs.reset_at, None);
    }
}
