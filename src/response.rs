use reqwest::{header::HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    decode::{self, Unwrap},
    Result,
};

pub(crate) const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub(crate) const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub(crate) const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// A fully-read HTTP response: status, headers and raw body text.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Rate-limit counters reported by SendGrid on every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) at which the window resets.
    pub reset: u64,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Reads a header as an unsigned integer, ignoring malformed values.
    pub fn header_u64(&self, name: &str) -> Option<u64> {
        self.headers
            .get(name)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
    }

    /// Returns the `X-RateLimit-*` counters when all three are present.
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        Some(RateLimitInfo {
            limit: self.header_u64(RATE_LIMIT_LIMIT)?,
            remaining: self.header_u64(RATE_LIMIT_REMAINING)?,
            reset: self.header_u64(RATE_LIMIT_RESET)?,
        })
    }

    /// Deserializes the body according to `unwrap`. See [`decode::parse`].
    pub fn parse<T: DeserializeOwned>(&self, unwrap: &Unwrap) -> Result<T> {
        decode::parse(self, unwrap)
    }

    /// Deserializes the whole body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        decode::parse(self, &Unwrap::WholeBody)
    }

    /// Deserializes the value stored under `key` in the top-level object.
    pub fn json_field<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        decode::parse(self, &Unwrap::field(key))
    }

    /// Converts a non-success status into [`crate::SendGridError::Http`].
    pub fn error_for_status(self) -> Result<Self> {
        decode::ensure_success(&self)?;
        Ok(self)
    }
}
