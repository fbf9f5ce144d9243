/// A single entry of the `errors` array SendGrid returns on failed requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorDetail {
    /// Request field the message refers to, when the API names one.
    pub field: Option<String>,
    /// Human-readable error message from upstream API.
    pub message: String,
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SendGridError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http {
        status: u16,
        body: String,
        /// Parsed `errors` envelope; empty when the body has another shape.
        errors: Vec<ApiErrorDetail>,
    },
    /// Request body could not be serialized to JSON.
    #[error("encode error: {0}")]
    Encode(String),
    /// Response decoding or envelope-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// The caller's cancellation signal fired before the call completed.
    #[error("request cancelled")]
    Cancelled,
    /// Missing or invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SendGridError {
    /// HTTP status code for [`SendGridError::Http`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}
