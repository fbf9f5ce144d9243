/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("sendgrid-http/", env!("CARGO_PKG_VERSION"));

/// Configures HTTP timeout and default request headers.
///
/// Retry behavior is configured separately through
/// [`SendGridClient::with_retry_strategy`](crate::SendGridClient::with_retry_strategy).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Subuser to impersonate via the `on-behalf-of` header.
    pub on_behalf_of: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            on_behalf_of: None,
        }
    }
}
