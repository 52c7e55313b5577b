//! Rate limit signals sent by the remote API.
//!
//! A `429 Too Many Requests` response tells us how long to back off through
//! its `Retry-After` header. [`RateLimitSignal`] captures that wait.

mod headers;

use std::time::Duration;

use http::HeaderMap;
use http::header::RETRY_AFTER;

/// How long to wait when a rate-limited response carries no usable
/// `Retry-After` header, 5 seconds.
pub const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(5);

/// The wait requested by a rate-limited response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// How long to wait before sending the request again
    pub wait: Duration,
}

impl RateLimitSignal {
    /// Derive the wait from response headers.
    ///
    /// A valid `Retry-After` value is used verbatim, even when it is shorter
    /// than `fallback`. Leniency: a malformed header is not an error, it
    /// gets the same `fallback` as a missing one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, fallback: Duration) -> Self {
        let Some(value) = headers.get(RETRY_AFTER) else {
            return Self { wait: fallback };
        };

        match headers::parse_retry_after(value) {
            Ok(wait) => Self { wait },
            Err(e) => {
                log::warn!(
                    "Ignoring malformed Retry-After header ({e}), waiting {}ms instead",
                    fallback.as_millis()
                );
                Self { wait: fallback }
            }
        }
    }
}
