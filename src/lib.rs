//! `sendgrid-http` is the async HTTP core of a SendGrid v3 API client.
//!
//! It owns everything the per-resource wrappers share:
//! - [`SendGridClient`] composes URLs, injects auth headers and retries
//!   rate-limited calls through a pluggable [`RetryStrategy`]
//! - [`decode::parse`] turns an [`ApiResponse`] into a typed value, optionally
//!   unwrapping a named envelope key ([`Unwrap`])
//! - [`CancellationSignal`] aborts in-flight calls and pending retry waits
//!
//! ```no_run
//! use sendgrid_http::SendGridClient;
//!
//! # async fn run() -> sendgrid_http::Result<()> {
//! let client = SendGridClient::new("SG.my-api-key");
//! let count: u64 = client
//!     .get("contactdb/recipients/count")
//!     .as_json_field("recipient_count")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod cancel;
mod client;
pub mod decode;
mod error;
mod options;
mod response;
pub mod retry;
mod wire;

pub use cancel::CancellationSignal;
pub use client::{join_url, RequestBuilder, SendGridClient, DEFAULT_BASE_URL};
pub use decode::Unwrap;
pub use error::{ApiErrorDetail, SendGridError};
pub use options::{ClientOptions, DEFAULT_USER_AGENT};
pub use response::{ApiResponse, RateLimitInfo};
pub use retry::{BackoffRetryStrategy, NoRetry, RateLimitRetryStrategy, RetryStrategy};

pub use reqwest::{Method, StatusCode};

pub type Result<T> = std::result::Result<T, SendGridError>;
