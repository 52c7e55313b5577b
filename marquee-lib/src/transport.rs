//! The HTTP stack underneath the executor.
//!
//! [`HyperTransport`] is `hyper_util`'s pooled client with
//! [`HappyEyeballsConnector`] plugged in as its dial strategy and
//! `hyper-rustls` layered on top for `https` URLs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::racer::{Dialer, HappyEyeballsConnector, HttpStream, TcpDialer};
use crate::resolver::{Resolve, SystemResolver};
use crate::{ApiRequest, ApiResponse, ErrorKind, Result};

/// Sends one HTTP request and collects its response.
///
/// Implementations report every HTTP status as a response. Only failures to
/// exchange a request at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` once
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

type HttpsClient<R, D> = Client<HttpsConnector<HappyEyeballsConnector<R, D>>, Full<Bytes>>;

/// [`Transport`] backed by `hyper_util`'s client.
#[derive(Debug)]
pub struct HyperTransport<R = SystemResolver, D = TcpDialer> {
    client: HttpsClient<R, D>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl<R, D> Clone for HyperTransport<R, D> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            default_headers: self.default_headers.clone(),
            timeout: self.timeout,
        }
    }
}

impl<R: Resolve, D: Dialer> HyperTransport<R, D>
where
    D::Stream: HttpStream,
{
    /// Create a transport dialing through `connector`.
    ///
    /// `default_headers` are sent with every request unless the request
    /// sets the same header itself. `timeout` bounds a single exchange,
    /// including reading the body.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Tls`] if the TLS configuration cannot be set up.
    pub fn new(
        connector: HappyEyeballsConnector<R, D>,
        default_headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)?
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        let mut builder = Client::builder(TokioExecutor::new());
        // The pool needs a timer to expire idle connections
        builder.pool_timer(TokioTimer::new());
        let client = builder.build::<_, Full<Bytes>>(https);

        Ok(Self {
            client,
            default_headers,
            timeout,
        })
    }

    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = http::Request::builder().method(method).uri(url.as_str());
        if let Some(map) = builder.headers_mut() {
            map.extend(self.default_headers.clone());
            map.extend(headers);
        }
        let request = builder
            .body(Full::new(body))
            .map_err(ErrorKind::BuildRequest)?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ErrorKind::NetworkRequest(e).lift_connect_failure())?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(ErrorKind::ReadResponseBody)?
            .to_bytes();

        Ok(ApiResponse::new(parts.status, parts.headers, body))
    }
}

#[async_trait]
impl<R: Resolve, D: Dialer> Transport for HyperTransport<R, D>
where
    D::Stream: HttpStream,
{
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(request))
                .await
                .map_err(|_| ErrorKind::Timeout(timeout))?,
            None => self.exchange(request).await,
        }
    }
}
