use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{
    cancel::wait_cancelled, ApiResponse, CancellationSignal, ClientOptions, RateLimitRetryStrategy,
    Result, RetryStrategy, SendGridError, Unwrap,
};

/// Base URL of the SendGrid v3 REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/v3";

const ON_BEHALF_OF: &str = "on-behalf-of";

/// Joins a base URL and a relative path with exactly one `/` between them.
///
/// Example: `("https://api.sendgrid.com/v3/", "/contacts")` →
/// `"https://api.sendgrid.com/v3/contacts"`
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}

/// HTTP client for the SendGrid v3 API.
///
/// Cloning is cheap; clones share the connection pool and retry strategy.
#[derive(Clone)]
pub struct SendGridClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
    options: ClientOptions,
    retry: Arc<dyn RetryStrategy>,
}

impl fmt::Debug for SendGridClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendGridClient")
            .field("base_url", &self.base_url)
            .field("authorization", &"<redacted>")
            .field("options", &self.options)
            .field("retry", &self.retry)
            .finish()
    }
}

impl SendGridClient {
    /// Creates a client for the public API endpoint.
    ///
    /// If the key is missing the `Bearer ` prefix, it is added automatically.
    pub fn new(api_key: impl AsRef<str>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client against a custom base URL, e.g. a regional endpoint
    /// or a local mock server.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl AsRef<str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            authorization: normalize_bearer_authorization(api_key.as_ref()),
            options: ClientOptions::default(),
            retry: Arc::new(RateLimitRetryStrategy::default()),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `SENDGRID_API_KEY`: API key (Bearer prefix optional)
    /// - `SENDGRID_BASE_URL`: optional, defaults to [`DEFAULT_BASE_URL`]
    ///
    /// **Not available on `wasm32` targets**: environment variables do not
    /// exist in browser runtimes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sendgrid_http::SendGridClient;
    ///
    /// let client = SendGridClient::from_env().expect("missing SENDGRID_API_KEY");
    /// ```
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SENDGRID_API_KEY").map_err(|_| {
            SendGridError::Config("missing SENDGRID_API_KEY environment variable".to_owned())
        })?;
        if api_key.trim().is_empty() {
            return Err(SendGridError::Config(
                "SENDGRID_API_KEY is set but empty".to_owned(),
            ));
        }

        match std::env::var("SENDGRID_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                Ok(Self::with_base_url(base_url.trim(), api_key))
            }
            _ => Ok(Self::new(api_key)),
        }
    }

    /// Applies client options such as timeout and default headers.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the retry strategy consulted after every response.
    pub fn with_retry_strategy<S>(mut self, strategy: S) -> Self
    where
        S: RetryStrategy + 'static,
    {
        self.retry = Arc::new(strategy);
        self
    }

    /// Uses a preconfigured `reqwest` client (proxies, custom TLS, ...).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::PATCH, path)
    }

    pub fn put(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Starts a request with an arbitrary method. `path` is relative to the
    /// base URL; a leading `/` is optional.
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            cancel: None,
        }
    }

    async fn send_with_retry(
        &self,
        method: &Method,
        path: &str,
        body: Option<&JsonValue>,
        query: &[(String, String)],
        cancel: Option<&CancellationSignal>,
    ) -> Result<ApiResponse> {
        let url = join_url(&self.base_url, path);
        let max_retries = self.retry.max_retries();
        let mut attempt = 0u32;

        loop {
            if cancel.is_some_and(|signal| signal.is_cancelled()) {
                return Err(self.cancelled(attempt));
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(%method, %url, attempt, "sending request");

            let request = self.build_request(method.clone(), &url, body, query);
            let response = tokio::select! {
                biased;
                _ = wait_cancelled(cancel) => return Err(self.cancelled(attempt)),
                response = execute(request) => response?,
            };

            if attempt < max_retries && self.retry.should_retry(attempt, &response) {
                let delay = self.retry.next_delay(attempt, &response);

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    status = response.status().as_u16(),
                    delay_ms = delay.as_millis() as u64,
                    attempt,
                    "retrying request"
                );

                let waited = tokio::select! {
                    biased;
                    _ = wait_cancelled(cancel) => return Err(self.cancelled(attempt)),
                    waited = wait_before_retry(delay) => waited,
                };
                if !waited {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, "no timer available, returning without retry");
                    return Ok(response);
                }
                attempt += 1;
                continue;
            }

            #[cfg(feature = "tracing")]
            if max_retries > 0 && attempt == max_retries && !response.is_success() {
                tracing::warn!(
                    status = response.status().as_u16(),
                    attempts = attempt + 1,
                    "retry budget exhausted"
                );
            }

            return Ok(response);
        }
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&JsonValue>,
        query: &[(String, String)],
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.options.user_agent)
            .timeout(Duration::from_millis(self.options.timeout_ms));

        if let Some(subuser) = &self.options.on_behalf_of {
            request = request.header(ON_BEHALF_OF, subuser);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            // `json` also sets `Content-Type: application/json`.
            request = request.json(body);
        }
        request
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn cancelled(&self, attempt: u32) -> SendGridError {
        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, "request cancelled");
        SendGridError::Cancelled
    }
}

/// A single logical API call, built from one of the verb methods on
/// [`SendGridClient`].
///
/// Retries resend the identical method, path, query and body.
#[must_use = "requests do nothing until sent"]
pub struct RequestBuilder<'a> {
    client: &'a SendGridClient,
    method: Method,
    path: String,
    body: Option<std::result::Result<JsonValue, String>>,
    query: Vec<(String, String)>,
    cancel: Option<&'a CancellationSignal>,
}

impl fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("query", &self.query)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl<'a> RequestBuilder<'a> {
    /// Sets a JSON request body. Serialization errors surface from `send`.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(serde_json::to_value(body).map_err(|err| err.to_string()));
        self
    }

    /// Appends a query-string pair, e.g. `page_size=100`.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Aborts the call with [`SendGridError::Cancelled`] once `signal` fires,
    /// whether the request is in flight or waiting to be retried.
    pub fn cancel_on(mut self, signal: &'a CancellationSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Sends the request and returns the final response as-is, including
    /// non-success statuses.
    pub async fn send(self) -> Result<ApiResponse> {
        let body = self
            .body
            .transpose()
            .map_err(|err| SendGridError::Encode(format!("invalid request body: {err}")))?;
        self.client
            .send_with_retry(
                &self.method,
                &self.path,
                body.as_ref(),
                &self.query,
                self.cancel,
            )
            .await
    }

    /// Sends the request and deserializes the response body.
    pub async fn parse<T: DeserializeOwned>(self, unwrap: &Unwrap) -> Result<T> {
        self.send().await?.parse(unwrap)
    }

    /// Sends the request and deserializes the whole response body.
    pub async fn as_json<T: DeserializeOwned>(self) -> Result<T> {
        self.parse(&Unwrap::WholeBody).await
    }

    /// Sends the request and deserializes the value under `key`.
    pub async fn as_json_field<T: DeserializeOwned>(self, key: &str) -> Result<T> {
        self.parse(&Unwrap::field(key)).await
    }

    /// Sends the request and discards a successful body.
    pub async fn expect_success(self) -> Result<()> {
        self.send().await?.error_for_status().map(|_| ())
    }
}

async fn execute(request: reqwest::RequestBuilder) -> Result<ApiResponse> {
    let response = request.send().await.map_err(SendGridError::Transport)?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.map_err(SendGridError::Transport)?;
    Ok(ApiResponse::new(status, headers, body))
}

/// Waits before the next retry attempt.
///
/// Returns `false` when the runtime offers no timer, in which case the
/// response is returned instead of being resent immediately.
#[cfg(not(target_arch = "wasm32"))]
async fn wait_before_retry(delay: Duration) -> bool {
    sleep(delay).await;
    true
}

/// WASM: `tokio::time` is unavailable, so the wait is a `setTimeout` promise
/// looked up on the global object (window, worker or edge runtime).
#[cfg(target_arch = "wasm32")]
async fn wait_before_retry(delay: Duration) -> bool {
    use wasm_bindgen::{JsCast, JsValue};

    let millis = delay.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let global = js_sys::global();
        let set_timeout = js_sys::Reflect::get(&global, &JsValue::from_str("setTimeout"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        let scheduled = match set_timeout {
            Some(timer) => timer.call2(&global, &resolve, &JsValue::from(millis)).is_ok(),
            None => false,
        };
        if !scheduled {
            let _ = reject.call0(&JsValue::NULL);
        }
    });
    wasm_bindgen_futures::JsFuture::from(promise).await.is_ok()
}

fn normalize_bearer_authorization(api_key: &str) -> String {
    let trimmed = api_key.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
