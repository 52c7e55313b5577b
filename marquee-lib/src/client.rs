//! Entry point for talking to the remote API.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` executes requests and returns responses.
//! `ClientBuilder` exposes a finer level of granularity for building
//! a `Client`.
//!
//! For convenience, a free function [`get`] is provided for ad-hoc
//! requests.
#![allow(clippy::module_name_repetitions)]
use std::time::Duration;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::Method;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;
use url::Url;

use crate::config::TransportConfig;
use crate::executor::{DEFAULT_MAX_RETRY_COUNT, RequestExecutor, validate_max_retry_count};
use crate::racer::{HappyEyeballs, HappyEyeballsConnector, STAGGER_DELAY, TcpDialer};
use crate::ratelimit::RATE_LIMIT_FALLBACK;
use crate::resolver::SystemResolver;
use crate::transport::HyperTransport;
use crate::{ApiRequest, ApiResponse, ErrorKind, Result};

/// Default user agent, `marquee/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("marquee/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// How often a request answered with `429 Too Many Requests` is sent
    /// again before giving up.
    ///
    /// Zero sends every request exactly once. Negative values are rejected
    /// by [`ClientBuilder::client`].
    #[builder(default_code = "i64::from(DEFAULT_MAX_RETRY_COUNT)")]
    max_retry_count: i64,

    /// Delay between starting two connection attempts to different
    /// addresses of the same host.
    #[builder(default = STAGGER_DELAY)]
    stagger_delay: Duration,

    /// Wait applied when a `429` response carries no usable `Retry-After`
    /// header.
    #[builder(default = RATE_LIMIT_FALLBACK)]
    rate_limit_fallback: Duration,

    /// Upper bound for a single send, including reading the body.
    ///
    /// A send that times out is not retried.
    timeout: Option<Duration>,

    /// User-agent sent with every request, unless the request sets its own.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Sets the default [headers] for every request.
    ///
    /// Headers set on an individual [`ApiRequest`] take precedence.
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    custom_headers: HeaderMap,

    /// Shutdown token of the client.
    ///
    /// Cancelling it aborts every pending connection race and request.
    cancel: CancellationToken,
}

impl Default for ClientBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<TransportConfig> for ClientBuilder {
    fn from(config: TransportConfig) -> Self {
        Self::builder()
            .max_retry_count(config.max_retry_count)
            .stagger_delay(config.stagger_delay)
            .rate_limit_fallback(config.rate_limit_fallback)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .custom_headers(config.headers)
            .build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - `max_retry_count` is negative.
    /// - The user agent contains characters not allowed in a header.
    /// - The TLS backend cannot be initialized.
    pub fn client(self) -> Result<Client> {
        let Self {
            max_retry_count,
            stagger_delay,
            rate_limit_fallback,
            timeout,
            user_agent,
            custom_headers,
            cancel,
        } = self;

        validate_max_retry_count(max_retry_count)?;

        let mut headers = custom_headers;
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, HeaderValue::try_from(user_agent)?);
        }

        let racer = HappyEyeballs::new(SystemResolver, TcpDialer).with_stagger_delay(stagger_delay);
        let connector = HappyEyeballsConnector::new(racer, cancel.clone());
        let transport = HyperTransport::new(connector, headers, timeout)?;

        let executor = RequestExecutor::new(transport)
            .with_fallback_wait(rate_limit_fallback)
            .with_max_retry_count(max_retry_count)?;

        Ok(Client { executor, cancel })
    }
}

/// Executes requests against the remote API.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    /// Retrying request executor on top of the HTTP stack
    executor: RequestExecutor<HyperTransport>,

    /// Client-wide shutdown token
    cancel: CancellationToken,
}

impl Client {
    /// Execute one logical call.
    ///
    /// Rate-limited attempts are retried transparently, so the response is
    /// the one of the last attempt. Its status may be any status other than
    /// `401` or `429`.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - `url` is not a valid absolute URL.
    /// - `cancel` fires, or the client is shut down, before the call
    ///   completes.
    /// - The server answers `401 Unauthorized`.
    /// - The server still answers `429 Too Many Requests` once all retries
    ///   are used up.
    /// - No connection can be established, see [`ErrorKind::connect_failure`].
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        let url = Url::parse(url).map_err(|e| ErrorKind::InvalidUri(format!("{url}: {e}")))?;
        let request = ApiRequest::new(method, url)
            .with_headers(headers)
            .with_body(body);
        self.request(request, cancel).await
    }

    /// Execute a prepared [`ApiRequest`].
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn request(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ErrorKind::RequestCancelled),
            response = self.executor.execute(request, cancel) => response,
        }
    }

    /// The current retry bound
    #[must_use]
    pub fn max_retry_count(&self) -> u32 {
        self.executor.max_retry_count()
    }

    /// Change how often rate-limited requests are sent again.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidMaxRetryCount`] if `max_retry_count` is
    /// negative. The previous value stays in effect.
    pub fn set_max_retry_count(&mut self, max_retry_count: i64) -> Result<()> {
        self.executor.set_max_retry_count(max_retry_count)
    }

    /// Abort every pending request and connection race of this client and
    /// all of its clones.
    pub fn shutdown(&self) {
        log::debug!("Shutting down client");
        self.cancel.cancel();
    }

    /// Returns `true` once [`Client::shutdown`] was called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A shorthand function to `GET` a single URL.
///
/// This creates a new [`Client`] with the default configuration on every
/// call. For more complex scenarios, see documentation of [`ClientBuilder`]
/// instead.
///
/// # Errors
///
/// Returns an `Err` if:
/// - The client cannot be built (see [`ClientBuilder::client`] for failure cases).
/// - The request fails (see [`Client::execute`] for failure cases).
pub async fn get(url: &str) -> Result<ApiResponse> {
    let client = ClientBuilder::builder().build().client()?;
    client
        .execute(
            Method::GET,
            url,
            HeaderMap::new(),
            Bytes::new(),
            &CancellationToken::new(),
        )
        .await
}
