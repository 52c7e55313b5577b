use std::error::Error;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// A single failed connection attempt made during a race.
#[derive(Debug)]
pub struct AttemptError {
    /// The address that was dialed
    pub address: SocketAddr,
    /// Why the connect failed
    pub source: io::Error,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.address, self.source)
    }
}

/// Possible errors when talking to the remote API through `marquee_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// DNS resolution produced no usable address for the host.
    #[error("Host not found: `{host}`")]
    HostNotFound {
        /// The host that was looked up
        host: String,
        /// The resolver error, if the lookup itself failed
        #[source]
        source: Option<io::Error>,
    },

    /// Every address of a connection race was tried and none connected.
    #[error("All connection attempts failed: [{}]", display_attempts(.0))]
    AllConnectionsFailed(Vec<AttemptError>),

    /// The connection race was cancelled before a winner emerged.
    #[error("Connection race was cancelled")]
    RaceCancelled,

    /// The request was cancelled while being sent or while waiting to retry.
    #[error("Request was cancelled")]
    RequestCancelled,

    /// The server kept answering with `429 Too Many Requests` after all
    /// retries were used up.
    #[error("Request limit exceeded after {attempts} attempts (max retry count: {max_retry_count})")]
    RequestLimitExceeded {
        /// Number of requests that were sent
        attempts: u32,
        /// The configured retry bound
        max_retry_count: u32,
    },

    /// The server rejected the credentials of the request.
    #[error("Unauthorized: the API rejected the supplied credentials")]
    Unauthorized,

    /// A retry count that is negative or does not fit a `u32` was configured.
    #[error("Invalid max retry count {}: must be between 0 and {}", .0, u32::MAX)]
    InvalidMaxRetryCount(i64),

    /// The URL cannot be used to reach an endpoint.
    #[error("Invalid URI `{0}`")]
    InvalidUri(String),

    /// The URI of a connection request carries no host.
    #[error("URI is missing a host: `{0}`")]
    MissingHost(http::Uri),

    /// The HTTP request could not be assembled.
    #[error("Failed to build request")]
    BuildRequest(#[source] http::Error),

    /// The HTTP stack failed to deliver the request.
    #[error("Network error while sending the request")]
    NetworkRequest(#[source] hyper_util::client::legacy::Error),

    /// The response body could not be read.
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] hyper::Error),

    /// A single send took longer than the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A header value could not be parsed.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The TLS layer could not be initialized.
    #[error("Failed to initialize TLS: {0}")]
    Tls(#[from] rustls::Error),

    /// The configuration file could not be read.
    #[error("Cannot read config file `{}`: {}", .0.display(), .1)]
    ConfigRead(PathBuf, #[source] io::Error),

    /// The configuration file is not valid TOML for this crate.
    #[error("Cannot parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl ErrorKind {
    /// Return more details about the given [`ErrorKind`]
    ///
    /// Which additional information we can extract depends on the underlying
    /// request type. The output is purely meant for humans.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            ErrorKind::HostNotFound { source, .. } => Some(match source {
                Some(e) => format!("DNS resolution failed: {e}"),
                None => "DNS resolution returned no addresses".to_string(),
            }),
            ErrorKind::AllConnectionsFailed(attempts) => Some(format!(
                "Tried {} address(es), none accepted a connection",
                attempts.len()
            )),
            ErrorKind::RequestLimitExceeded { .. } => Some(
                StatusCode::TOO_MANY_REQUESTS
                    .canonical_reason()
                    .unwrap_or("Too Many Requests")
                    .to_string(),
            ),
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED
                .canonical_reason()
                .map(String::from),
            ErrorKind::NetworkRequest(e) => match self.connect_failure() {
                Some(inner) => inner.details().or_else(|| Some(inner.to_string())),
                None => Some(e.to_string()),
            },
            ErrorKind::ReadResponseBody(e) => Some(e.to_string()),
            _ => None,
        }
    }

    /// The typed connector error behind a [`ErrorKind::NetworkRequest`].
    ///
    /// The HTTP stack wraps whatever our connector returned, so a
    /// `HostNotFound` or `AllConnectionsFailed` raised while dialing shows
    /// up here instead of as a raw socket error.
    #[must_use]
    pub fn connect_failure(&self) -> Option<&ErrorKind> {
        match self {
            ErrorKind::NetworkRequest(e) => source_error::<ErrorKind>(e),
            _ => None,
        }
    }

    /// Replace a [`ErrorKind::NetworkRequest`] raised while connecting by
    /// the typed connector error behind it.
    ///
    /// The HTTP stack owns the connector error, so the returned value is an
    /// equivalent copy. I/O sources keep their kind and message.
    #[must_use]
    pub(crate) fn lift_connect_failure(self) -> Self {
        let connect_error = match &self {
            ErrorKind::NetworkRequest(e) if e.is_connect() => source_error::<ErrorKind>(e),
            _ => None,
        };
        let lifted = match connect_error {
            Some(ErrorKind::HostNotFound { host, source }) => Some(ErrorKind::HostNotFound {
                host: host.clone(),
                source: source.as_ref().map(copy_io_error),
            }),
            Some(ErrorKind::AllConnectionsFailed(attempts)) => {
                Some(ErrorKind::AllConnectionsFailed(
                    attempts
                        .iter()
                        .map(|attempt| AttemptError {
                            address: attempt.address,
                            source: copy_io_error(&attempt.source),
                        })
                        .collect(),
                ))
            }
            Some(ErrorKind::RaceCancelled) => Some(ErrorKind::RaceCancelled),
            Some(ErrorKind::MissingHost(uri)) => Some(ErrorKind::MissingHost(uri.clone())),
            Some(ErrorKind::InvalidUri(uri)) => Some(ErrorKind::InvalidUri(uri.clone())),
            _ => None,
        };
        lifted.unwrap_or(self)
    }

    /// Returns `true` if the error is the shape of a cancelled operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            ErrorKind::RaceCancelled | ErrorKind::RequestCancelled => true,
            ErrorKind::NetworkRequest(_) => self
                .connect_failure()
                .is_some_and(ErrorKind::is_cancelled),
            _ => false,
        }
    }
}

fn display_attempts(attempts: &[AttemptError]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn copy_io_error(e: &io::Error) -> io::Error {
    io::Error::new(e.kind(), e.to_string())
}

/// Downcasts the given err source into T.
fn source_error<T: Error + 'static>(err: &dyn Error) -> Option<&T> {
    let mut source = err.source();

    while let Some(err) = source {
        if let Some(inner) = err.downcast_ref::<T>() {
            return Some(inner);
        }

        source = err.source();
    }
    None
}
