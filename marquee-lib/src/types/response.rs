use std::fmt::Display;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// The final response of a logical API call.
///
/// Every status other than `401` and an exhausted `429` ends up here,
/// including other client and server errors. Interpreting those is up to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Status of the last attempt
    pub status: StatusCode,
    /// Headers of the last attempt
    pub headers: HeaderMap,
    /// Fully collected response body
    pub body: Bytes,
}

impl ApiResponse {
    /// Create a response from its parts
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[inline]
    #[must_use]
    /// Returns `true` for `2xx` responses
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body as UTF-8 text, replacing invalid sequences
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Display for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} bytes)", self.status, self.body.len())
    }
}
