//! Credential pool and rate-budget tracking.
//!
//! All quota state lives here and is mutated only through
//! [`CredentialPool::observe`]. The pool never sleeps itself: it returns a
//! [`RateDecision`] and the transport turns `RetryAfter` into an actual
//! suspension, so a concurrent redesign can substitute a non-blocking timer
//! without touching this module.

use std::time::Duration;

use chrono::{DateTime, Utc};
use octoharvest_types::HarvestError;
use tracing::{debug, warn};

/// Configuration for quota handling.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Remaining-quota margin below which the pool rotates preemptively.
    pub buffer_threshold: u32,
    /// Extra wait added on top of the upstream reset time.
    pub safety_margin: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            buffer_threshold: 5,
            safety_margin: Duration::from_secs(5),
        }
    }
}

/// Rate state parsed from one upstream response.
#[derive(Debug, Clone, Copy)]
pub struct RateObservation {
    /// HTTP status of the response.
    pub status: u16,
    /// `X-RateLimit-Remaining`, when present and numeric.
    pub remaining: Option<u32>,
    /// `X-RateLimit-Reset` as a UTC timestamp, when present and numeric.
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateObservation {
    /// True if the status signals hard quota exhaustion: a 403 with zero
    /// remaining quota. Secondary-limit 429s are left to the transport's
    /// backoff.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.status == 403 && self.remaining == Some(0)
    }
}

/// What the caller should do after a quota observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Quota is fine (possibly after a preemptive rotation); use the response.
    Proceed,
    /// Quota exhausted; suspend the flow for this long, then retry the same
    /// request. The retry does not count against the transport attempt cap.
    RetryAfter(Duration),
    /// Quota exhausted with no reset information; non-retryable for this page.
    Exhausted,
}

/// A single credential with its mutable quota state.
#[derive(Debug, Clone)]
struct Credential {
    token: String,
    remaining: Option<u32>,
    reset_at: Option<DateTime<Utc>>,
}

/// Ordered set of credentials with one active at a time.
///
/// The only cross-cutting mutable state in the engine. The single harvest
/// flow accesses it sequentially; a multi-worker design must serialize on
/// it (the transport already keeps it behind a mutex).
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    active: usize,
    config: RateLimitConfig,
}

impl CredentialPool {
    /// Creates a pool from an ordered list of tokens.
    ///
    /// Empty tokens are filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::NoCredentials`] if no usable token remains.
    pub fn new(tokens: Vec<String>, config: RateLimitConfig) -> Result<Self, HarvestError> {
        let credentials: Vec<Credential> = tokens
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(|token| Credential {
                token,
                remaining: None,
                reset_at: None,
            })
            .collect();

        if credentials.is_empty() {
            return Err(HarvestError::NoCredentials);
        }

        Ok(Self {
            credentials,
            active: 0,
            config,
        })
    }

    /// Returns the currently active credential's token.
    #[must_use]
    pub fn acquire(&self) -> &str {
        &self.credentials[self.active].token
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// True if the pool holds no credentials (never, post-construction).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Index of the active credential. Exposed for diagnostics.
    #[must_use]
    pub const fn active_index(&self) -> usize {
        self.active
    }

    /// Records the rate state of a response and decides how to continue.
    ///
    /// `now` is passed in so the sleep computation is deterministic in tests.
    pub fn observe(&mut self, obs: &RateObservation, now: DateTime<Utc>) -> RateDecision {
        {
            let active = &mut self.credentials[self.active];
            active.remaining = obs.remaining.or(active.remaining);
            active.reset_at = obs.reset_at.or(active.reset_at);
        }

        if obs.is_exhausted() {
            return match obs.reset_at {
                Some(reset) => {
                    let wait = (reset - now).num_seconds().max(0) as u64;
                    let sleep = Duration::from_secs(wait) + self.config.safety_margin;
                    warn!(
                        sleep_secs = sleep.as_secs(),
                        credential = self.active,
                        "rate limit exhausted, sleeping until reset"
                    );
                    RateDecision::RetryAfter(sleep)
                }
                None => RateDecision::Exhausted,
            };
        }

        if let Some(remaining) = obs.remaining {
            if remaining < self.config.buffer_threshold && self.credentials.len() > 1 {
                self.rotate(remaining);
            } else {
                debug!(remaining, credential = self.active, "quota observed");
            }
        }

        RateDecision::Proceed
    }

    fn rotate(&mut self, remaining: u32) {
        let from = self.active;
        self.active = (self.active + 1) % self.credentials.len();
        warn!(
            remaining,
            from,
            to = self.active,
            "quota below buffer, rotating credential"
        );
    }
}
