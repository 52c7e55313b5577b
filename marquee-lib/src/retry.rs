use http::StatusCode;

use crate::ApiResponse;

/// An extension trait to help determine if a given HTTP response
/// is worth sending again.
///
/// Only rate limiting qualifies. Server errors, timeouts and connection
/// failures are left to the caller, and `401 Unauthorized` can never
/// succeed on a retry with the same credentials.
pub(crate) trait RetryExt {
    fn should_retry(&self) -> bool;
}

impl RetryExt for StatusCode {
    fn should_retry(&self) -> bool {
        *self == StatusCode::TOO_MANY_REQUESTS
    }
}

impl RetryExt for ApiResponse {
    fn should_retry(&self) -> bool {
        self.status.should_retry()
    }
}
