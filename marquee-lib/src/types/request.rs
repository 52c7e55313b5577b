use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

use crate::{ErrorKind, Result};

/// A single logical call to the remote API.
///
/// The body is kept as [`Bytes`], so re-sending the request after a
/// rate-limit response is a cheap clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method, e.g. `GET` or `POST`.
    pub method: Method,
    /// Absolute URL of the resource
    pub url: Url,
    /// Headers sent in addition to the client's default headers
    pub headers: HeaderMap,
    /// Request payload, empty for most API calls
    pub body: Bytes,
}

impl ApiRequest {
    /// Create a new request without extra headers or body
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Convenience constructor for a `GET` request
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid absolute URL.
    pub fn get(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| ErrorKind::InvalidUri(format!("{url}: {e}")))?;
        Ok(Self::new(Method::GET, url))
    }

    /// Replace the request headers
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Replace the request payload
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}
