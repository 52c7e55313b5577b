//! Rate-limit aware execution of a single logical API call.

use std::time::Duration;

use http::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::ratelimit::{RATE_LIMIT_FALLBACK, RateLimitSignal};
use crate::retry::RetryExt;
use crate::transport::Transport;
use crate::{ApiRequest, ApiResponse, ErrorKind, Result};

/// Default number of times a rate-limited request is sent again.
/// Zero means every request is sent exactly once.
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 0;

/// Check a configured retry count and convert it into a bound.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidMaxRetryCount`] for negative values and for
/// values beyond `u32::MAX`.
pub(crate) fn validate_max_retry_count(max_retry_count: i64) -> Result<u32> {
    u32::try_from(max_retry_count).map_err(|_| ErrorKind::InvalidMaxRetryCount(max_retry_count))
}

/// Bookkeeping for one logical request
#[derive(Debug)]
struct RetryState {
    attempts_made: u32,
    max_retries: u32,
    last_status: Option<StatusCode>,
}

impl RetryState {
    const fn new(max_retries: u32) -> Self {
        Self {
            attempts_made: 0,
            max_retries,
            last_status: None,
        }
    }

    fn record(&mut self, status: StatusCode) {
        self.attempts_made += 1;
        self.last_status = Some(status);
    }

    /// All retries are used up once the number of sends exceeds the bound
    const fn exhausted(&self) -> bool {
        self.attempts_made > self.max_retries
    }
}

/// Sends requests through a [`Transport`] and retries them while the server
/// answers `429 Too Many Requests`.
///
/// Each retry waits for the interval the server asked for in `Retry-After`,
/// or for the fallback wait if it did not say.
#[derive(Debug, Clone)]
pub struct RequestExecutor<T> {
    transport: T,
    max_retry_count: u32,
    fallback_wait: Duration,
}

impl<T: Transport> RequestExecutor<T> {
    /// Create an executor that does not retry
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            fallback_wait: RATE_LIMIT_FALLBACK,
        }
    }

    /// Allow up to `max_retry_count` retries.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidMaxRetryCount`] if the count is negative
    /// or does not fit a `u32`.
    pub fn with_max_retry_count(mut self, max_retry_count: i64) -> Result<Self> {
        self.set_max_retry_count(max_retry_count)?;
        Ok(self)
    }

    /// Wait `fallback_wait` when a `429` carries no usable `Retry-After`
    #[must_use]
    pub const fn with_fallback_wait(mut self, fallback_wait: Duration) -> Self {
        self.fallback_wait = fallback_wait;
        self
    }

    /// Change the retry bound for subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidMaxRetryCount`] if the count is negative
    /// or does not fit a `u32`. The current bound is kept in that case.
    pub fn set_max_retry_count(&mut self, max_retry_count: i64) -> Result<()> {
        self.max_retry_count = validate_max_retry_count(max_retry_count)?;
        Ok(())
    }

    /// The current retry bound
    #[must_use]
    pub const fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    /// The underlying transport
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` until it gets a response that is not rate limited or
    /// the retries run out.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Unauthorized`] on a `401` response.
    /// - [`ErrorKind::RequestLimitExceeded`] if the last allowed attempt was
    ///   rate limited as well.
    /// - [`ErrorKind::RequestCancelled`] if `cancel` fires during a send or
    ///   while waiting to retry.
    /// - Any error of the transport, which is never retried.
    pub async fn execute(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        let mut state = RetryState::new(self.max_retry_count);

        loop {
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ErrorKind::RequestCancelled),
                response = self.transport.send(request.clone()) => response?,
            };
            state.record(response.status);

            if response.status == StatusCode::UNAUTHORIZED {
                return Err(ErrorKind::Unauthorized);
            }
            if !response.should_retry() {
                return Ok(response);
            }
            if state.exhausted() {
                log::debug!(
                    "Giving up on {} {} after {} attempt(s), last status {:?}",
                    request.method,
                    request.url,
                    state.attempts_made,
                    state.last_status
                );
                return Err(ErrorKind::RequestLimitExceeded {
                    attempts: state.attempts_made,
                    max_retry_count: state.max_retries,
                });
            }

            let signal = RateLimitSignal::from_headers(&response.headers, self.fallback_wait);
            log::debug!(
                "Rate limited on {} {}, waiting {}ms before retry {}/{}",
                request.method,
                request.url,
                signal.wait.as_millis(),
                state.attempts_made,
                state.max_retries
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ErrorKind::RequestCancelled),
                () = tokio::time::sleep(signal.wait) => {}
            }
        }
    }
}
