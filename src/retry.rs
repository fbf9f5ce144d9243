//! Retry policies consulted by [`SendGridClient`](crate::SendGridClient)
//! after every response.
//!
//! `attempt` is the number of retries already performed for the current call,
//! so the first decision is made with `attempt == 0`. The client never asks
//! once `attempt` reaches [`RetryStrategy::max_retries`], which bounds a call
//! to `max_retries() + 1` physical requests.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

use crate::{response::RATE_LIMIT_RESET, ApiResponse};

/// Decides whether a response is retried and how long to wait first.
pub trait RetryStrategy: fmt::Debug + Send + Sync {
    /// Maximum number of retries after the initial attempt.
    fn max_retries(&self) -> u32;

    fn should_retry(&self, attempt: u32, response: &ApiResponse) -> bool;

    fn next_delay(&self, attempt: u32, response: &ApiResponse) -> Duration;
}

/// Default strategy: retries `429 Too Many Requests` only.
///
/// The delay honors `Retry-After` (seconds), then `X-RateLimit-Reset`
/// (unix seconds), and falls back to `default_delay`. It never exceeds
/// `max_delay`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateLimitRetryStrategy {
    pub max_retries: u32,
    pub default_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RateLimitRetryStrategy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RateLimitRetryStrategy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn delay_at(&self, response: &ApiResponse, now_secs: u64) -> Duration {
        let hinted = response
            .header_u64(reqwest::header::RETRY_AFTER.as_str())
            .map(Duration::from_secs)
            .or_else(|| {
                response
                    .header_u64(RATE_LIMIT_RESET)
                    .filter(|reset| *reset > now_secs)
                    .map(|reset| Duration::from_secs(reset - now_secs))
            });

        hinted.unwrap_or(self.default_delay).min(self.max_delay)
    }
}

impl RetryStrategy for RateLimitRetryStrategy {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, _attempt: u32, response: &ApiResponse) -> bool {
        response.status() == StatusCode::TOO_MANY_REQUESTS
    }

    fn next_delay(&self, _attempt: u32, response: &ApiResponse) -> Duration {
        self.delay_at(response, unix_now_secs())
    }
}

/// Retries rate limits and transient gateway/server errors with exponential
/// backoff: `base_delay * 2^attempt`, capped at `max_delay`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackoffRetryStrategy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffRetryStrategy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryStrategy for BackoffRetryStrategy {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, _attempt: u32, response: &ApiResponse) -> bool {
        matches!(
            response.status(),
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }

    fn next_delay(&self, attempt: u32, _response: &ApiResponse) -> Duration {
        let exp = attempt.min(16);
        let multiplier = 1u32 << exp;
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

/// Never retries; every call issues exactly one request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn max_retries(&self) -> u32 {
        0
    }

    fn should_retry(&self, _attempt: u32, _response: &ApiResponse) -> bool {
        false
    }

    fn next_delay(&self, _attempt: u32, _response: &ApiResponse) -> Duration {
        Duration::ZERO
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn unix_now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

// SystemTime::now() is unsupported on wasm32-unknown-unknown.
#[cfg(target_arch = "wasm32")]
fn unix_now_secs() -> u64 {
    (js_sys::Date::now() / 1000.0) as u64
}
